//! Seasonal temperatures and rainfall
//!
//! Seasonal values oscillate around the annual figures from the base climate
//! and water cycle. The swing grows with distance from the equator, and the
//! two hemispheres are half a year apart.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ClimateParams;
use crate::grid::GridBounds;
use crate::region::N_SEASONS;
use crate::world::WorldMap;

// =============================================================================
// SEASON DEFINITIONS
// =============================================================================

/// The four seasons, in the order of the per-region seasonal arrays
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring = 0,
    Summer = 1,
    Autumn = 2,
    Winter = 3,
}

impl Season {
    pub fn all() -> [Season; N_SEASONS] {
        [Season::Spring, Season::Summer, Season::Autumn, Season::Winter]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }

    /// Phase on the yearly cycle for the hemisphere at the top of the map
    /// (summer = 0, winter = PI).
    fn phase(&self) -> f32 {
        match self {
            Season::Spring => -FRAC_PI_2,
            Season::Summer => 0.0,
            Season::Autumn => FRAC_PI_2,
            Season::Winter => PI,
        }
    }
}

// =============================================================================
// SEASONAL VALUES
// =============================================================================

/// Distance from the equator in [0, 1] (the equator is the middle row) and
/// which hemisphere the latitude lies in.
fn polar_distance(lat: f32) -> (f32, bool) {
    (((lat - 0.5).abs() * 2.0).min(1.0), lat < 0.5)
}

/// Seasonal mean temperature at a latitude.
pub fn seasonal_temperature(mean: f32, lat: f32, season: Season, params: &ClimateParams) -> f32 {
    let (distance, top_half) = polar_distance(lat);
    let mut phase = season.phase();
    if !top_half {
        phase += PI;
    }
    mean + params.seasonal_temp_amplitude * distance * phase.cos()
}

/// Seasonal rainfall (mm/year) at a latitude. Wettest in spring, driest in
/// autumn, so that the yearly mean is unchanged.
pub fn seasonal_rainfall(annual: f32, lat: f32, season: Season, params: &ClimateParams) -> f32 {
    let (distance, top_half) = polar_distance(lat);
    let mut phase = season.phase();
    if !top_half {
        phase += PI;
    }
    (annual * (1.0 - params.seasonal_rain_swing * distance * phase.sin())).max(0.0)
}

/// Fill every region's seasonal temperature and rainfall arrays.
pub fn compute_seasons(world: &mut WorldMap) {
    let params = world.config.climate.clone();
    let height = world.height() as f32;
    for (pos, region) in world.regions.iter_mut() {
        let lat = pos.y as f32 / height;
        let weather = &mut region.weather;
        for season in Season::all() {
            let i = season.index();
            let mean = seasonal_temperature(weather.mean_temp, lat, season, &params);
            weather.temp_mean[i] = mean;
            weather.temp_low[i] = mean - params.diurnal_range;
            weather.temp_high[i] = mean + params.diurnal_range;
            weather.rainfall[i] = seasonal_rainfall(weather.total_precipitation, lat, season, &params);
        }
    }
    info!("seasonal climate computed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;

    #[test]
    fn test_season_indices_match_order() {
        for (i, season) in Season::all().iter().enumerate() {
            assert_eq!(season.index(), i);
        }
        assert_eq!(Season::Winter.name(), "Winter");
    }

    #[test]
    fn test_equator_has_no_seasons() {
        let params = ClimateParams::default();
        for season in Season::all() {
            assert!((seasonal_temperature(25.0, 0.5, season, &params) - 25.0).abs() < 1e-4);
            assert!((seasonal_rainfall(1200.0, 0.5, season, &params) - 1200.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_hemispheres_are_opposite() {
        let params = ClimateParams::default();
        let north = seasonal_temperature(0.0, 0.1, Season::Summer, &params);
        let south = seasonal_temperature(0.0, 0.9, Season::Summer, &params);
        assert!(north > 0.0);
        assert!(south < 0.0);
        assert!((north + south).abs() < 1e-4);
    }

    #[test]
    fn test_seasons_preserve_annual_means() {
        let mut world = WorldMap::new(1, 4, 10, GenerationConfig::default());
        for (_, region) in world.regions.iter_mut() {
            region.weather.mean_temp = 8.0;
            region.weather.total_precipitation = 900.0;
        }
        compute_seasons(&mut world);
        for (_, region) in world.regions.iter() {
            let w = &region.weather;
            let temp: f32 = w.temp_mean.iter().sum::<f32>() / N_SEASONS as f32;
            let rain: f32 = w.rainfall.iter().sum::<f32>() / N_SEASONS as f32;
            assert!((temp - 8.0).abs() < 1e-3);
            assert!((rain - 900.0).abs() < 1e-2);
            for i in 0..N_SEASONS {
                assert!(w.temp_low[i] < w.temp_mean[i] && w.temp_mean[i] < w.temp_high[i]);
            }
        }
    }
}

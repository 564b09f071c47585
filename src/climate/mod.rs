//! Climate generation: base wind, temperature and precipitation quotients,
//! followed by the water-cycle simulation and seasonal values.

pub mod seasons;
pub mod summary;
pub mod water_cycle;

pub use seasons::{compute_seasons, Season};
pub use summary::{classify_altitude, classify_precipitation, classify_temperature, summarize_all_regions};
pub use water_cycle::{evaporation_floors, simulate_water_cycle, water_cycle_rain, water_cycle_step};

use std::f32::consts::{FRAC_PI_2, TAU};

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::ClimateParams;
use crate::grid::{GridBounds, RegionPos};
use crate::math::angle_difference;
use crate::region::{heights, WorldRegion};
use crate::world::WorldMap;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Elevation remap: the lower `REMAP_MID` of the land range is squashed onto
/// `[0, REMAP_TO]` with exponent `REMAP_POWER`.
const ELEV_REMAP_MID: f32 = 0.4;
const ELEV_REMAP_POWER: f32 = 1.6;
const ELEV_REMAP_TO: f32 = 0.7;

const WIND_DISTORTION_SCALE: f32 = 1.2;
const WIND_DISTORTION_STRENGTH: f32 = 0.6;

const EVAPORATION_TEMP_SCALING: f32 = 1.3 / 30.0;
const EVAPORATION_TEMP_INFLUENCE: f32 = 0.6;

// =============================================================================
// SHAPING FUNCTIONS
// =============================================================================

/// Map a height to an elevation in [-1, 1]: linear below sea level, remapped
/// above it so that lowlands stay low and mountains rise quickly.
pub fn elevation(height: f32) -> f32 {
    let result = if height > heights::SEA_LEVEL {
        (height - heights::SEA_LEVEL) / (heights::MOUNTAIN_TOPS - heights::SEA_LEVEL)
    } else {
        (height - heights::SEA_LEVEL) / heights::SEA_LEVEL
    };
    if result <= 0.0 {
        result.max(-1.0)
    } else if result >= 1.0 {
        1.0
    } else if result < ELEV_REMAP_MID {
        (result / ELEV_REMAP_MID).powf(ELEV_REMAP_POWER) * ELEV_REMAP_TO
    } else {
        let t = (result - ELEV_REMAP_MID) / (1.0 - ELEV_REMAP_MID);
        ELEV_REMAP_TO + (1.0 - ELEV_REMAP_TO) * t.powf(1.0 / ELEV_REMAP_POWER)
    }
}

/// How strongly a temperature drives evaporation; zero when very cold.
pub fn temp_evap_influence(temp: f32) -> f32 {
    (0.5 + EVAPORATION_TEMP_INFLUENCE * temp * EVAPORATION_TEMP_SCALING).max(0.0)
}

/// Evaporation noise source for a world.
pub fn evaporation_noise(world: &WorldMap) -> Perlin {
    Perlin::new(world.seeds.evaporation as u32)
}

/// Base evaporation (the cloud potential floor) for a region.
pub fn evaporation(world: &WorldMap, noise: &Perlin, pos: RegionPos) -> f32 {
    let params = &world.config.climate;
    let region = world.region(pos);
    let (lat, lon) = lat_lon(world, pos);
    let temp = temp_evap_influence(region.weather.mean_temp);
    let elev = elevation(region.topography.mean_height).max(0.0);

    let n = noise.get([
        (lat * params.evaporation_noise_scale) as f64,
        (lon * params.evaporation_noise_scale) as f64,
    ]) as f32;
    let mut result = (1.0 + n) / 2.0 * params.evaporation_noise_base * (1.0 + temp) * 0.5;
    let base = if region.hydrology.body.is_some() {
        params.base_water_cloud_potential
    } else {
        params.base_land_cloud_potential
    };
    result += base * temp * (1.0 - elev);
    result
}

/// Normalized (latitude, longitude) of a region: y and x over the map size.
pub fn lat_lon(world: &WorldMap, pos: RegionPos) -> (f32, f32) {
    (
        pos.y as f32 / world.height() as f32,
        pos.x as f32 / world.width() as f32,
    )
}

// =============================================================================
// BASE CLIMATE
// =============================================================================

/// Noise fields behind the base climate, all drawn from the climate seed.
struct ClimateNoise {
    wind_x: Perlin,
    wind_y: Perlin,
    wind_phase: (f32, f32),
    temperature: Perlin,
}

impl ClimateNoise {
    fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self {
            wind_x: Perlin::new(rng.gen()),
            wind_y: Perlin::new(rng.gen()),
            wind_phase: (rng.gen_range(0.0..TAU), rng.gen_range(0.0..TAU)),
            temperature: Perlin::new(rng.gen()),
        }
    }

    /// Circulation-cell potential in [0, 1] at normalized map coordinates.
    fn wind_potential(&self, u: f32, v: f32, cells: f32) -> f32 {
        let s = WIND_DISTORTION_SCALE * cells;
        let du = self.wind_x.get([(u * s) as f64, (v * s) as f64]) as f32;
        let dv = self.wind_y.get([(u * s) as f64, (v * s) as f64]) as f32;
        let du = du * WIND_DISTORTION_STRENGTH / cells;
        let dv = dv * WIND_DISTORTION_STRENGTH / cells;
        let a = (u + du) * cells * TAU + self.wind_phase.0;
        let b = (v + dv) * cells * TAU + self.wind_phase.1;
        (1.0 + a.sin() * b.sin()) / 2.0
    }

    /// Wind (strength, direction): winds run along the contours of the
    /// circulation potential, with strength from its slope.
    fn wind(&self, u: f32, v: f32, params: &ClimateParams) -> (f32, f32) {
        let h = 1e-3;
        let cells = params.wind_cells;
        let gu = (self.wind_potential(u + h, v, cells) - self.wind_potential(u - h, v, cells)) / (2.0 * h);
        let gv = (self.wind_potential(u, v + h, cells) - self.wind_potential(u, v - h, cells)) / (2.0 * h);
        let slope = (gu * gu + gv * gv).sqrt() / (cells * TAU) * params.base_wind_strength;
        (slope, gv.atan2(gu) - FRAC_PI_2)
    }
}

fn base_temperature(noise: &ClimateNoise, lat: f32, lon: f32, elev: f32, params: &ClimateParams) -> f32 {
    let mut base = ((1.0 - (lat * TAU).cos()) / 2.0).powf(0.8);
    base += params.temp_distortion_strength
        * noise.temperature.get([
            (lat * params.temp_distortion_scale) as f64,
            (lon * params.temp_distortion_scale) as f64,
        ]) as f32;
    let mut temp = params.arctic_temp + (params.equator_temp - params.arctic_temp) * base;
    if elev > 0.0 {
        temp += params.elevation_temp_adjust * elev;
    }
    if temp < params.arctic_temp {
        temp = params.arctic_temp - (params.arctic_temp - temp).sqrt();
    }
    temp
}

fn precipitation_quotient(region: &WorldRegion, elev: f32, params: &ClimateParams) -> f32 {
    let pq = if elev < 0.0 {
        if region.hydrology.body.is_some() {
            params.water_precipitation_quotient
        } else {
            params.land_precipitation_quotient
        }
    } else {
        params.land_precipitation_quotient + params.elevation_precipitation_quotient * elev
    };
    pq.clamp(0.0, 1.0)
}

/// Derive wind, temperature, precipitation quotient and initial cloud
/// potential for every region.
pub fn generate_base_climate(world: &mut WorldMap) {
    let params = world.config.climate.clone();
    let blocks = world.config.terrain.region_blocks;
    let noise = ClimateNoise::new(world.seeds.climate);

    for pos in world.regions.positions().collect::<Vec<_>>() {
        let (lat, lon) = lat_lon(world, pos);
        let region = world.region_mut(pos);
        let elev = elevation(region.topography.mean_height);

        let (mut strength, mut direction) = noise.wind(lon, lat, &params);
        if region.topography.min_height > heights::SEA_LEVEL {
            // Terrain steers the wind along its contours without changing speed.
            let gross = region.topography.gross_height;
            let r2 = gross.slope() / blocks * params.wind_land_influence;
            if strength + r2 > 0.0 {
                direction += r2 / (strength + r2) * angle_difference(gross.contour(), direction);
            }
        }
        strength = strength.max(0.0);

        let pq = precipitation_quotient(region, elev, &params);
        let weather = &mut region.weather;
        weather.wind_strength = strength;
        weather.wind_direction = direction;
        weather.mean_temp = base_temperature(&noise, lat, lon, elev, &params);
        weather.precipitation_quotient = pq;
        weather.next_cloud_potential = 0.0;
        weather.total_precipitation = 0.0;
        weather.next_total_precipitation = 0.0;
    }

    // Cloud potential starts at the evaporation floor, which needs the temperatures above.
    let evap = evaporation_noise(world);
    for pos in world.regions.positions().collect::<Vec<_>>() {
        let cp = evaporation(world, &evap, pos);
        world.region_mut(pos).weather.cloud_potential = cp;
    }
}

/// Full climate pass: base values, water cycle, seasons.
pub fn generate_climate(world: &mut WorldMap) {
    generate_base_climate(world);
    info!("base climate computed");
    simulate_water_cycle(world);
    compute_seasons(world);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;

    #[test]
    fn test_elevation_range_and_monotonic() {
        assert_eq!(elevation(heights::SEA_LEVEL), 0.0);
        assert_eq!(elevation(0.0), -1.0);
        assert_eq!(elevation(heights::MOUNTAIN_TOPS), 1.0);
        assert_eq!(elevation(heights::MOUNTAIN_TOPS * 2.0), 1.0);
        let mut prev = -1.0;
        for i in 0..=100 {
            let h = i as f32 * 300.0;
            let e = elevation(h);
            assert!(e >= prev - 1e-6, "elevation dropped at {h}");
            assert!((-1.0..=1.0).contains(&e));
            prev = e;
        }
    }

    #[test]
    fn test_elevation_remap_is_continuous_at_mid() {
        let mid_height = heights::SEA_LEVEL + ELEV_REMAP_MID * (heights::MOUNTAIN_TOPS - heights::SEA_LEVEL);
        let below = elevation(mid_height - 1.0);
        let above = elevation(mid_height + 1.0);
        assert!((below - ELEV_REMAP_TO).abs() < 0.01);
        assert!((above - ELEV_REMAP_TO).abs() < 0.01);
    }

    #[test]
    fn test_temp_evap_influence() {
        assert!((temp_evap_influence(0.0) - 0.5).abs() < 1e-6);
        assert!(temp_evap_influence(30.0) > temp_evap_influence(10.0));
        assert_eq!(temp_evap_influence(-40.0), 0.0);
    }

    fn ocean_world() -> WorldMap {
        let mut world = WorldMap::new(5, 8, 8, GenerationConfig::small_test());
        for (_, region) in world.regions.iter_mut() {
            region.topography.min_height = 9000.0;
            region.topography.max_height = 9000.0;
            region.topography.mean_height = 9000.0;
        }
        world
    }

    #[test]
    fn test_base_climate_values_in_range() {
        let mut world = ocean_world();
        generate_base_climate(&mut world);
        let params = world.config.climate.clone();
        for (_, region) in world.regions.iter() {
            let w = &region.weather;
            assert!(w.wind_strength.is_finite() && w.wind_strength >= 0.0);
            assert!(w.wind_direction.is_finite());
            assert!((0.0..=1.0).contains(&w.precipitation_quotient));
            assert!(w.cloud_potential > 0.0);
            // Sea level temperatures stay near the arctic..equator band.
            assert!(w.mean_temp > params.arctic_temp - 5.0);
            assert!(w.mean_temp < params.equator_temp + 10.0);
        }
    }

    #[test]
    fn test_equator_warmer_than_poles() {
        let mut world = ocean_world();
        generate_base_climate(&mut world);
        let pole = world.region(RegionPos::new(3, 0)).weather.mean_temp;
        let equator = world.region(RegionPos::new(3, 4)).weather.mean_temp;
        assert!(equator > pole + 20.0);
    }

    #[test]
    fn test_mountains_are_colder() {
        let mut world = ocean_world();
        let peak = RegionPos::new(3, 4);
        {
            let topo = &mut world.region_mut(peak).topography;
            topo.min_height = 24000.0;
            topo.max_height = 26000.0;
            topo.mean_height = 25000.0;
        }
        generate_base_climate(&mut world);
        let sea = world.region(RegionPos::new(4, 4)).weather.mean_temp;
        let high = world.region(peak).weather.mean_temp;
        assert!(high < sea - 10.0);
        assert!(world.region(peak).weather.precipitation_quotient > 0.3);
    }
}

//! Per-region category summaries: altitude band, precipitation class and
//! temperature class.

use tracing::info;

use crate::region::{
    heights, AltitudeCategory, PrecipitationCategory, RegionSummary, TemperatureCategory, N_SEASONS,
};
use crate::world::WorldMap;

// ===== PRECIPITATION THRESHOLDS (mm/year) =====

const DESERT: f32 = 250.0;
const ARID: f32 = 500.0;
const NORMAL: f32 = 1000.0;
const LUSH: f32 = 1800.0;
const SOAKED: f32 = 3000.0;
/// Wettest minus driest season above this makes a normal region seasonal.
const SEASONAL_SWING: f32 = 500.0;

// ===== TEMPERATURE THRESHOLDS (deg C) =====

const TUNDRA_YEAR_HIGH: f32 = 10.0;
const ANTARCTIC_YEAR_HIGH: f32 = -10.0;
const TUNDRA_MEAN: f32 = -5.0;
const COLD_MEAN: f32 = 5.0;
const MODERATE_MEAN: f32 = 12.0;
const WARM_MEAN: f32 = 18.0;
const SUBTROPICAL_MEAN: f32 = 22.0;
const TROPICAL_MEAN: f32 = 26.0;
const REGULAR_FROST: f32 = -5.0;
const OCCASIONAL_FROST: f32 = 2.0;

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn classify_altitude(height: f32) -> AltitudeCategory {
    use heights::*;
    if height < lerp(OCEAN_DEPTHS, CONTINENTAL_SHELF, 0.9) {
        AltitudeCategory::OceanDepths
    } else if height < SEA_LEVEL {
        AltitudeCategory::ContinentalShelf
    } else if height < lerp(COASTAL_PLAINS, HIGHLANDS, 0.3) {
        AltitudeCategory::CoastalPlains
    } else if height < lerp(COASTAL_PLAINS, HIGHLANDS, 0.9) {
        AltitudeCategory::InlandHills
    } else if height < lerp(HIGHLANDS, MOUNTAIN_BASES, 0.9) {
        AltitudeCategory::Highlands
    } else if height < lerp(MOUNTAIN_BASES, MOUNTAIN_TOPS, 0.4) {
        AltitudeCategory::MountainSlopes
    } else {
        AltitudeCategory::MountainPeaks
    }
}

/// Classify seasonal rainfall (mm/year per season) by its annual mean.
pub fn classify_precipitation(rainfall: &[f32; N_SEASONS]) -> PrecipitationCategory {
    let mean = rainfall.iter().sum::<f32>() / N_SEASONS as f32;
    if mean < DESERT {
        PrecipitationCategory::Desert
    } else if mean < ARID {
        PrecipitationCategory::Arid
    } else if mean < lerp(ARID, NORMAL, 0.4) {
        PrecipitationCategory::Dry
    } else if mean < lerp(NORMAL, LUSH, 0.5) {
        let wettest = rainfall.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let driest = rainfall.iter().copied().fold(f32::INFINITY, f32::min);
        if wettest - driest > SEASONAL_SWING {
            PrecipitationCategory::Seasonal
        } else {
            PrecipitationCategory::Normal
        }
    } else if mean < LUSH {
        PrecipitationCategory::Wet
    } else if mean < SOAKED {
        PrecipitationCategory::Soaking
    } else {
        PrecipitationCategory::Flooded
    }
}

/// Classify a region from its seasonal lows and means.
///
/// The arctic check looks at the warmest half of the year: if even summer
/// stays near freezing the region is arctic regardless of its annual mean.
pub fn classify_temperature(lows: &[f32; N_SEASONS], means: &[f32; N_SEASONS]) -> TemperatureCategory {
    let mean = means.iter().sum::<f32>() / N_SEASONS as f32;
    let coldest = lows.iter().copied().fold(f32::INFINITY, f32::min);

    let mut sorted = *means;
    sorted.sort_by(|a, b| a.total_cmp(b));
    let summer = (sorted[N_SEASONS - 1] + sorted[N_SEASONS - 2]) / 2.0;

    if summer < lerp(ANTARCTIC_YEAR_HIGH, TUNDRA_YEAR_HIGH, 0.6) {
        TemperatureCategory::Arctic
    } else if mean < lerp(TUNDRA_MEAN, COLD_MEAN, 0.5) {
        TemperatureCategory::Tundra
    } else if mean < lerp(COLD_MEAN, MODERATE_MEAN, 0.5) {
        if coldest < REGULAR_FROST {
            TemperatureCategory::ColdFrost
        } else {
            TemperatureCategory::ColdRareFrost
        }
    } else if mean < lerp(MODERATE_MEAN, WARM_MEAN, 0.5) {
        if coldest < OCCASIONAL_FROST {
            TemperatureCategory::MildFrost
        } else {
            TemperatureCategory::MildRareFrost
        }
    } else if mean < lerp(WARM_MEAN, SUBTROPICAL_MEAN, 0.5) {
        if coldest < OCCASIONAL_FROST {
            TemperatureCategory::WarmFrost
        } else {
            TemperatureCategory::WarmNoFrost
        }
    } else if mean < lerp(SUBTROPICAL_MEAN, TROPICAL_MEAN, 0.5) {
        TemperatureCategory::Hot
    } else {
        TemperatureCategory::Tropical
    }
}

pub fn summarize_all_regions(world: &mut WorldMap) {
    for (_, region) in world.regions.iter_mut() {
        let weather = &region.weather;
        region.summary = RegionSummary {
            altitude: classify_altitude(region.topography.mean_height),
            precipitation: classify_precipitation(&weather.rainfall),
            temperature: classify_temperature(&weather.temp_low, &weather.temp_mean),
        };
    }
    info!("region summaries assigned");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_altitude_bands() {
        assert_eq!(classify_altitude(heights::OCEAN_DEPTHS), AltitudeCategory::OceanDepths);
        assert_eq!(classify_altitude(14_900.0), AltitudeCategory::ContinentalShelf);
        assert_eq!(classify_altitude(heights::SEA_LEVEL), AltitudeCategory::CoastalPlains);
        assert_eq!(classify_altitude(16_000.0), AltitudeCategory::InlandHills);
        assert_eq!(classify_altitude(17_000.0), AltitudeCategory::Highlands);
        assert_eq!(classify_altitude(19_000.0), AltitudeCategory::MountainSlopes);
        assert_eq!(classify_altitude(heights::MOUNTAIN_TOPS), AltitudeCategory::MountainPeaks);
    }

    #[test]
    fn test_altitude_is_monotone() {
        let mut last = classify_altitude(0.0);
        let mut h = 0.0;
        while h < 30_000.0 {
            let c = classify_altitude(h);
            assert!(c as u8 >= last as u8);
            last = c;
            h += 50.0;
        }
    }

    #[test]
    fn test_precipitation_classes() {
        assert_eq!(classify_precipitation(&[100.0; 4]), PrecipitationCategory::Desert);
        assert_eq!(classify_precipitation(&[400.0; 4]), PrecipitationCategory::Arid);
        assert_eq!(classify_precipitation(&[600.0; 4]), PrecipitationCategory::Dry);
        assert_eq!(classify_precipitation(&[1000.0; 4]), PrecipitationCategory::Normal);
        assert_eq!(classify_precipitation(&[1600.0; 4]), PrecipitationCategory::Wet);
        assert_eq!(classify_precipitation(&[2500.0; 4]), PrecipitationCategory::Soaking);
        assert_eq!(classify_precipitation(&[4000.0; 4]), PrecipitationCategory::Flooded);
    }

    #[test]
    fn test_strong_swing_is_seasonal() {
        let swinging = [1400.0, 1000.0, 600.0, 1000.0];
        assert_eq!(classify_precipitation(&swinging), PrecipitationCategory::Seasonal);
        let mild = [1100.0, 1000.0, 900.0, 1000.0];
        assert_eq!(classify_precipitation(&mild), PrecipitationCategory::Normal);
    }

    #[test]
    fn test_temperature_classes() {
        let with_lows = |means: [f32; 4]| (means.map(|m| m - 8.0), means);

        let (lows, means) = with_lows([-20.0, -5.0, -20.0, -30.0]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::Arctic);

        let (lows, means) = with_lows([-5.0, 10.0, -5.0, -20.0]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::Tundra);

        let (lows, means) = with_lows([5.0, 15.0, 5.0, -5.0]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::ColdFrost);

        let (lows, means) = with_lows([12.0; 4]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::MildRareFrost);

        let (lows, means) = with_lows([12.0, 22.0, 12.0, 2.0]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::MildFrost);

        let (lows, means) = with_lows([19.0; 4]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::WarmNoFrost);

        let (lows, means) = with_lows([22.0; 4]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::Hot);

        let (lows, means) = with_lows([28.0; 4]);
        assert_eq!(classify_temperature(&lows, &means), TemperatureCategory::Tropical);
    }

    #[test]
    fn test_summarize_uses_region_fields() {
        use crate::config::GenerationConfig;
        use crate::grid::RegionPos;

        let mut world = WorldMap::new(3, 2, 1, GenerationConfig::default());
        {
            let region = world.region_mut(RegionPos::new(1, 0));
            region.topography.mean_height = 20_000.0;
            region.weather.rainfall = [100.0; 4];
            region.weather.temp_mean = [28.0; 4];
            region.weather.temp_low = [20.0; 4];
        }
        summarize_all_regions(&mut world);
        let summary = world.region(RegionPos::new(1, 0)).summary;
        assert_eq!(summary.altitude, AltitudeCategory::MountainSlopes);
        assert_eq!(summary.precipitation, PrecipitationCategory::Desert);
        assert_eq!(summary.temperature, TemperatureCategory::Tropical);
        let flat = world.region(RegionPos::new(0, 0)).summary;
        assert_eq!(flat.altitude, AltitudeCategory::OceanDepths);
        assert_eq!(flat.temperature, TemperatureCategory::Arctic);
    }
}

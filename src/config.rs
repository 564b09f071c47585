//! Generation parameters.
//!
//! All simulation-scale constants live in one serde-serializable structure so
//! that a world can be regenerated from `(seed, width, height, config)` alone.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`GenerationConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("map dimensions must be non-zero (got {width}x{height})")]
    EmptyMap { width: usize, height: usize },
    #[error("{name} must be positive (got {value})")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must lie in [0, 1] (got {value})")]
    NotAProbability { name: &'static str, value: f32 },
    #[error("{name} must lie strictly between 0 and 1 (got {value})")]
    NotAFraction { name: &'static str, value: f32 },
    #[error("{name}: minimum {min} exceeds maximum {max}")]
    InvertedBounds { name: &'static str, min: f32, max: f32 },
    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tectonic sheet construction and relaxation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TectonicParams {
    /// World regions per sheet row (the sheet is coarser than the region grid)
    pub sheet_scale: f32,
    /// Positional jitter (lattice units) for the coarse and fine rustle
    pub rustle_strengths: [f32; 2],
    /// Rustle noise periods across the sheet
    pub rustle_scales: [f32; 2],
    pub continent_strengths: [f32; 2],
    /// Continent periods across the sheet
    pub continent_scales: [f32; 2],
    pub ridge_strengths: [f32; 2],
    pub ridge_scales: [f32; 2],
    pub seam_count: usize,
    /// Seam reach as a fraction of the sheet's larger extent
    pub seam_distance: f32,
    /// Maximum planar displacement as a fraction of the seam reach
    pub seam_strength: f32,
    /// Falloff exponent of the seam push/pull
    pub seam_shape: f32,
    /// Height raised along collisions (and cut along rifts)
    pub seam_uplift: f32,
    pub settle_iterations: usize,
    pub settle_strength: f32,
    pub untangle_iterations: usize,
    /// Fraction of the way each point moves toward its neighbor centroid
    pub untangle_strength: f32,
    pub squash_low_cutoff: f32,
    pub squash_new_min: f32,
    pub squash_high_cutoff: f32,
    pub squash_new_max: f32,
    /// Weight of the pre-crumple heights when blended back in
    pub snapshot_blend: f32,
}

impl Default for TectonicParams {
    fn default() -> Self {
        Self {
            sheet_scale: 3.2,
            rustle_strengths: [0.45, 0.2],
            rustle_scales: [6.0, 13.0],
            continent_strengths: [1.0, 0.45],
            continent_scales: [1.3, 2.9],
            ridge_strengths: [0.35, 0.18],
            ridge_scales: [3.5, 7.5],
            seam_count: 6,
            seam_distance: 0.12,
            seam_strength: 0.35,
            seam_shape: 1.8,
            seam_uplift: 0.4,
            settle_iterations: 6,
            settle_strength: 0.2,
            untangle_iterations: 3,
            untangle_strength: 0.5,
            squash_low_cutoff: 0.22,
            squash_new_min: 0.12,
            squash_high_cutoff: 0.78,
            squash_new_max: 1.15,
            snapshot_blend: 0.3,
        }
    }
}

/// Sampling the tectonic heightfield into region topography.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Height samples per region side
    pub samples_per_side: usize,
    /// Amplitude of local detail noise (height units)
    pub detail_amplitude: f32,
    /// Detail noise periods per region
    pub detail_scale: f32,
    /// How far a region's lowest sample may sit above a water level before the
    /// water classifier treats it as dry land
    pub land_slack: f32,
    /// Blocks per region side, used to convert height gradients into slopes
    pub region_blocks: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            samples_per_side: 3,
            detail_amplitude: 1000.0,
            detail_scale: 0.35,
            land_slack: 90.0,
            region_blocks: 256.0,
        }
    }
}

/// Oceans, lakes and rivers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrologyParams {
    pub min_ocean_size: usize,
    /// `None` leaves ocean size unbounded
    pub max_ocean_size: Option<usize>,
    pub lake_probability: f32,
    pub min_lake_size: usize,
    pub max_lake_size: usize,
    pub min_lake_depth: f32,
    pub max_lake_depth: f32,
    /// Exponential squash of the lake depth distribution
    pub lake_depth_squash: f32,
    /// Each failed lake attempt retries at this fraction of the previous depth
    pub lake_depth_shrink: f32,
    pub briny_threshold: f32,
    pub saline_threshold: f32,
    pub brackish_threshold: f32,
    /// Seeding probability right after a river is placed
    pub river_seed_floor: f32,
    /// Multiplier applied to the seeding probability after each skipped shore region
    pub river_seed_climb: f32,
    /// Minimum distance (regions) between river mouths
    pub river_spacing: f32,
    /// Mean of the exponential part of a river's initial width
    pub river_width_mean: f32,
    pub max_river_width: f32,
    pub width_decrement_probability: f32,
    pub branch_probability: f32,
    pub river_iterations: usize,
    /// Length of one growth step (regions)
    pub river_step: f32,
    pub min_river_step: f32,
    pub max_rivers_per_region: usize,
    /// Blend weights: gross uphill, least-uphill neighbor, previous heading
    pub river_blend: [f32; 3],
}

impl Default for HydrologyParams {
    fn default() -> Self {
        Self {
            min_ocean_size: 20,
            max_ocean_size: None,
            lake_probability: 0.15,
            min_lake_size: 2,
            max_lake_size: 320,
            min_lake_depth: 18.0,
            max_lake_depth: 250.0,
            lake_depth_squash: 2.5,
            lake_depth_shrink: 0.9,
            briny_threshold: 0.02,
            saline_threshold: 0.025,
            brackish_threshold: 0.03,
            river_seed_floor: 0.04,
            river_seed_climb: 1.35,
            river_spacing: 2.5,
            river_width_mean: 1.5,
            max_river_width: 8.0,
            width_decrement_probability: 0.06,
            branch_probability: 0.03,
            river_iterations: 48,
            river_step: 1.0,
            min_river_step: 0.75,
            max_rivers_per_region: crate::region::MAX_RIVERS_PER_REGION,
            river_blend: [0.1, 0.4, 0.5],
        }
    }
}

/// Base climate and the water-cycle simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateParams {
    pub water_cycle_steps: usize,
    pub finish_steps: usize,
    pub recharge_rate: f32,
    pub wind_focus: f32,
    pub wind_focus_exp: f32,
    pub calm_diffusion: f32,
    /// Wind strength treated as "full" wind
    pub upper_wind_strength: f32,
    pub base_wind_strength: f32,
    /// Circulation cells across the map
    pub wind_cells: f32,
    pub wind_land_influence: f32,
    /// Scales averaged per-step rainfall into annual precipitation
    pub precipitation_factor: f32,
    pub land_precipitation_quotient: f32,
    pub water_precipitation_quotient: f32,
    pub elevation_precipitation_quotient: f32,
    pub arctic_temp: f32,
    pub equator_temp: f32,
    pub elevation_temp_adjust: f32,
    pub temp_distortion_scale: f32,
    pub temp_distortion_strength: f32,
    pub base_water_cloud_potential: f32,
    pub base_land_cloud_potential: f32,
    pub evaporation_noise_scale: f32,
    pub evaporation_noise_base: f32,
    /// Peak seasonal temperature swing at the poles
    pub seasonal_temp_amplitude: f32,
    /// Gap between daily mean and daily low/high
    pub diurnal_range: f32,
    /// Peak seasonal rainfall swing (fraction of the annual mean)
    pub seasonal_rain_swing: f32,
}

impl Default for ClimateParams {
    fn default() -> Self {
        Self {
            water_cycle_steps: 64,
            finish_steps: 1,
            recharge_rate: 0.07,
            wind_focus: 9.5,
            wind_focus_exp: 2.8,
            calm_diffusion: 2.0,
            upper_wind_strength: 5.0,
            base_wind_strength: 3.0,
            wind_cells: 2.6,
            wind_land_influence: 43.0,
            precipitation_factor: 10.0,
            land_precipitation_quotient: 0.085,
            water_precipitation_quotient: 0.085,
            elevation_precipitation_quotient: 0.45,
            arctic_temp: -20.0,
            equator_temp: 30.0,
            elevation_temp_adjust: -38.0,
            temp_distortion_scale: 4.5,
            temp_distortion_strength: 0.15,
            base_water_cloud_potential: 1500.0,
            base_land_cloud_potential: 600.0,
            evaporation_noise_scale: 2.4,
            evaporation_noise_base: 1900.0,
            seasonal_temp_amplitude: 14.0,
            diurnal_range: 8.0,
            seasonal_rain_swing: 0.35,
        }
    }
}

/// Everything world-map generation needs besides the seed and map size.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub tectonics: TectonicParams,
    pub terrain: TerrainParams,
    pub hydrology: HydrologyParams,
    pub climate: ClimateParams,
}

impl GenerationConfig {
    /// Cheap settings for tiny maps: fewer relaxation passes, shorter rivers
    /// and a short water cycle.
    pub fn small_test() -> Self {
        let mut config = Self::default();
        config.tectonics.seam_count = 2;
        config.tectonics.settle_iterations = 2;
        config.tectonics.untangle_iterations = 1;
        config.terrain.samples_per_side = 2;
        config.hydrology.min_ocean_size = 4;
        config.hydrology.river_iterations = 12;
        config.climate.water_cycle_steps = 8;
        config
    }

    /// Heavier relaxation and finer sampling for large showcase maps.
    pub fn detailed() -> Self {
        let mut config = Self::default();
        config.tectonics.seam_count = 10;
        config.tectonics.settle_iterations = 10;
        config.tectonics.untangle_iterations = 5;
        config.terrain.samples_per_side = 4;
        config.hydrology.river_iterations = 96;
        config.climate.finish_steps = 2;
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every parameter that could make a phase misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tectonics;
        positive("tectonics.sheet_scale", t.sheet_scale)?;
        for scale in t.rustle_scales.iter().chain(&t.continent_scales).chain(&t.ridge_scales) {
            positive("tectonics noise scale", *scale)?;
        }
        positive("tectonics.seam_distance", t.seam_distance)?;
        probability("tectonics.settle_strength", t.settle_strength)?;
        probability("tectonics.untangle_strength", t.untangle_strength)?;
        probability("tectonics.snapshot_blend", t.snapshot_blend)?;
        ordered("tectonics.squash cutoffs", t.squash_low_cutoff, t.squash_high_cutoff)?;
        ordered("tectonics.squash low", t.squash_new_min, t.squash_low_cutoff)?;

        let tr = &self.terrain;
        count("terrain.samples_per_side", tr.samples_per_side)?;
        positive("terrain.detail_scale", tr.detail_scale)?;
        positive("terrain.region_blocks", tr.region_blocks)?;

        let h = &self.hydrology;
        if let Some(max) = h.max_ocean_size {
            ordered("hydrology.ocean size", h.min_ocean_size as f32, max as f32)?;
        }
        probability("hydrology.lake_probability", h.lake_probability)?;
        ordered("hydrology.lake size", h.min_lake_size as f32, h.max_lake_size as f32)?;
        positive("hydrology.min_lake_depth", h.min_lake_depth)?;
        ordered("hydrology.lake depth", h.min_lake_depth, h.max_lake_depth)?;
        fraction("hydrology.lake_depth_shrink", h.lake_depth_shrink)?;
        ordered("hydrology.salinity thresholds", h.briny_threshold, h.saline_threshold)?;
        ordered("hydrology.salinity thresholds", h.saline_threshold, h.brackish_threshold)?;
        probability("hydrology.river_seed_floor", h.river_seed_floor)?;
        positive("hydrology.river_seed_climb", h.river_seed_climb)?;
        positive("hydrology.river_width_mean", h.river_width_mean)?;
        positive("hydrology.max_river_width", h.max_river_width)?;
        probability("hydrology.width_decrement_probability", h.width_decrement_probability)?;
        probability("hydrology.branch_probability", h.branch_probability)?;
        positive("hydrology.min_river_step", h.min_river_step)?;
        count("hydrology.max_rivers_per_region", h.max_rivers_per_region)?;
        if h.max_rivers_per_region > crate::region::MAX_RIVERS_PER_REGION {
            return Err(ConfigError::InvertedBounds {
                name: "hydrology.max_rivers_per_region",
                min: h.max_rivers_per_region as f32,
                max: crate::region::MAX_RIVERS_PER_REGION as f32,
            });
        }

        let c = &self.climate;
        count("climate.water_cycle_steps", c.water_cycle_steps)?;
        probability("climate.recharge_rate", c.recharge_rate)?;
        positive("climate.upper_wind_strength", c.upper_wind_strength)?;
        positive("climate.wind_cells", c.wind_cells)?;
        positive("climate.precipitation_factor", c.precipitation_factor)?;
        ordered("climate temperatures", c.arctic_temp, c.equator_temp)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn probability(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::NotAProbability { name, value })
    }
}

fn fraction(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::NotAFraction { name, value })
    }
}

fn ordered(name: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedBounds { name, min, max })
    }
}

fn count(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ConfigError::ZeroCount { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GenerationConfig::default().validate().is_ok());
        assert!(GenerationConfig::small_test().validate().is_ok());
        assert!(GenerationConfig::detailed().validate().is_ok());
    }

    #[test]
    fn test_bad_probability_rejected() {
        let mut config = GenerationConfig::default();
        config.hydrology.lake_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotAProbability { .. })
        ));
    }

    #[test]
    fn test_lake_depth_shrink_must_shrink() {
        for shrink in [0.0, 1.0, 1.2] {
            let mut config = GenerationConfig::default();
            config.hydrology.lake_depth_shrink = shrink;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::NotAFraction { .. })
            ));
        }
    }

    #[test]
    fn test_inverted_lake_bounds_rejected() {
        let mut config = GenerationConfig::default();
        config.hydrology.min_lake_size = 500;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedBounds { .. })
        ));
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let json = r#"{ "climate": { "water_cycle_steps": 12 } }"#;
        let config = GenerationConfig::from_json_str(json).unwrap();
        assert_eq!(config.climate.water_cycle_steps, 12);
        assert_eq!(config.hydrology, HydrologyParams::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = GenerationConfig::detailed();
        let json = config.to_json_pretty().unwrap();
        let parsed = GenerationConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_zero_water_cycle_steps_rejected() {
        let mut config = GenerationConfig::default();
        config.climate.water_cycle_steps = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCount { .. })));
    }
}

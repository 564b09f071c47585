//! World map container and generation pipeline
//!
//! `WorldMap` owns every region plus the arenas of bodies of water and rivers,
//! and is passed by `&mut` through each generation phase.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::climate;
use crate::config::{ConfigError, GenerationConfig};
use crate::grid::{Grid, GridBounds, RegionPos};
use crate::hydrology::{self, BodyOfWater, River};
use crate::region::{BodyOfWaterId, HydroState, RiverId, WorldRegion};
use crate::seeds::{position_seed, WorldSeeds};
use crate::tectonics;
use crate::topography;

/// Errors that stop world generation before it starts.
#[derive(Error, Debug)]
pub enum WorldGenError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// The world map and everything generated on it.
#[derive(Clone, Debug)]
pub struct WorldMap {
    /// Master seed
    pub seed: u64,
    pub seeds: WorldSeeds,
    pub config: GenerationConfig,
    pub regions: Grid<WorldRegion>,
    pub bodies: Vec<BodyOfWater>,
    pub rivers: Vec<River>,
}

impl GridBounds for WorldMap {
    fn width(&self) -> usize {
        self.regions.width()
    }

    fn height(&self) -> usize {
        self.regions.height()
    }
}

impl WorldMap {
    /// An empty world: every region is dry land with no water or rivers.
    pub fn new(seed: u64, width: usize, height: usize, config: GenerationConfig) -> Self {
        let seeds = WorldSeeds::from_master(seed);
        let regions = Grid::from_fn(width, height, |x, y| {
            WorldRegion::new(RegionPos::new(x, y), position_seed(seed, x, y))
        });
        Self {
            seed,
            seeds,
            config,
            regions,
            bodies: Vec::new(),
            rivers: Vec::new(),
        }
    }

    pub fn region(&self, pos: RegionPos) -> &WorldRegion {
        self.regions.get(pos)
    }

    pub fn region_mut(&mut self, pos: RegionPos) -> &mut WorldRegion {
        self.regions.get_mut(pos)
    }

    /// Signed lookup; `None` off the map.
    pub fn get_region(&self, x: i64, y: i64) -> Option<&WorldRegion> {
        self.regions.get_checked(x, y)
    }

    pub fn body(&self, id: BodyOfWaterId) -> &BodyOfWater {
        &self.bodies[id.0 as usize]
    }

    pub fn river(&self, id: RiverId) -> &River {
        &self.rivers[id.0 as usize]
    }

    /// Follow downhill links from `pos` to the local minimum they end in.
    pub fn find_valley(&self, pos: RegionPos) -> RegionPos {
        let mut current = pos;
        // Downhill links strictly decrease height, but never walk more than
        // the map's area in case the links were edited by hand.
        for _ in 0..self.area() {
            match self.region(current).topography.downhill {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    pub fn stats(&self) -> WorldStats {
        let mut stats = WorldStats {
            bodies: self.bodies.len(),
            rivers: self.rivers.len(),
            ..Default::default()
        };
        let mut precipitation = 0.0f64;
        let mut temperature = 0.0f64;
        for (_, region) in self.regions.iter() {
            match region.hydrology.state {
                HydroState::Land => stats.land += 1,
                HydroState::Ocean => stats.ocean += 1,
                HydroState::Lake => stats.lake += 1,
                HydroState::OceanShore | HydroState::LakeShore => stats.shore += 1,
            }
            precipitation += region.weather.total_precipitation as f64;
            temperature += region.weather.mean_temp as f64;
        }
        let n = self.area().max(1) as f64;
        stats.mean_precipitation = (precipitation / n) as f32;
        stats.mean_temperature = (temperature / n) as f32;
        stats
    }
}

/// Summary counts for logging and the CLI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldStats {
    pub land: usize,
    pub ocean: usize,
    pub lake: usize,
    pub shore: usize,
    pub bodies: usize,
    pub rivers: usize,
    pub mean_precipitation: f32,
    pub mean_temperature: f32,
}

/// Generate a complete world map.
///
/// Phases run in a fixed order: tectonics, topography, hydrology, climate,
/// summaries. The result depends only on the arguments.
pub fn generate_world_map(
    seed: u64,
    width: usize,
    height: usize,
    config: GenerationConfig,
) -> Result<WorldMap, WorldGenError> {
    if width == 0 || height == 0 {
        return Err(ConfigError::EmptyMap { width, height }.into());
    }
    config.validate()?;

    let mut world = WorldMap::new(seed, width, height, config);
    info!(seed, width, height, "generating world map");

    let sheet = tectonics::generate_tectonics(width, height, world.seeds.tectonics, &world.config.tectonics);
    topography::sample_topography(&mut world, &sheet);
    hydrology::generate_hydrology(&mut world);
    climate::generate_climate(&mut world);
    climate::summarize_all_regions(&mut world);

    let stats = world.stats();
    info!(
        land = stats.land,
        ocean = stats.ocean,
        lake = stats.lake,
        rivers = stats.rivers,
        "world map complete"
    );
    Ok(world)
}

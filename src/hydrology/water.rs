//! Oceans and lakes.
//!
//! Both are grown with the region search engine: a [`WaterFill`] visitor sorts
//! candidate regions into interior and shore at a given water level and only
//! writes hydrology state once the whole body has been accepted.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::HydrologyParams;
use crate::grid::{GridBounds, RegionPos};
use crate::region::{heights, BodyOfWaterId, HydroState, RiverId, Salinity};
use crate::search::{breadth_first, RegionVisitor, StepResult};
use crate::world::WorldMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaterKind {
    Ocean,
    Lake,
}

impl WaterKind {
    fn interior_state(&self) -> HydroState {
        match self {
            WaterKind::Ocean => HydroState::Ocean,
            WaterKind::Lake => HydroState::Lake,
        }
    }

    fn shore_state(&self) -> HydroState {
        match self {
            WaterKind::Ocean => HydroState::OceanShore,
            WaterKind::Lake => HydroState::LakeShore,
        }
    }
}

/// A connected set of regions sharing one water level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyOfWater {
    pub id: BodyOfWaterId,
    pub kind: WaterKind,
    pub origin: RegionPos,
    /// An arbitrary region on the shore, if the body has one
    pub shore_origin: Option<RegionPos>,
    pub level: f32,
    pub salinity: Salinity,
    /// Fully submerged regions
    pub area: usize,
    /// Regions straddling the water level
    pub shore_area: usize,
    pub rivers: Vec<RiverId>,
}

/// Search visitor that grows a body of water at a fixed level.
pub struct WaterFill {
    kind: WaterKind,
    level: f32,
    salinity: Salinity,
    land_slack: f32,
    origin: Option<RegionPos>,
    interior: Vec<RegionPos>,
    shore: Vec<RegionPos>,
    committed: Option<BodyOfWaterId>,
}

impl WaterFill {
    pub fn new(kind: WaterKind, level: f32, salinity: Salinity, land_slack: f32) -> Self {
        Self {
            kind,
            level,
            salinity,
            land_slack,
            origin: None,
            interior: Vec::new(),
            shore: Vec::new(),
            committed: None,
        }
    }

    /// The body created by a successful fill.
    pub fn committed(&self) -> Option<BodyOfWaterId> {
        self.committed
    }
}

impl RegionVisitor<WorldMap> for WaterFill {
    fn on_init(&mut self, _world: &mut WorldMap, origin: RegionPos) {
        self.origin = Some(origin);
        self.committed = None;
    }

    fn on_process(&mut self, world: &mut WorldMap, pos: RegionPos) -> StepResult {
        let region = world.region(pos);
        if region.hydrology.body.is_some() {
            // Ran into another body of water; the two would have to merge.
            return StepResult::Abort;
        }
        let topo = &region.topography;
        if topo.min_height - self.land_slack > self.level {
            StepResult::Ignore
        } else if topo.max_height <= self.level {
            self.interior.push(pos);
            StepResult::Continue
        } else {
            self.shore.push(pos);
            StepResult::Continue
        }
    }

    fn on_finish(&mut self, world: &mut WorldMap) {
        let id = BodyOfWaterId(world.bodies.len() as u32);
        let shore_salinity = self.salinity.one_class_lower();
        for &pos in &self.interior {
            let hydro = &mut world.region_mut(pos).hydrology;
            hydro.state = self.kind.interior_state();
            hydro.body = Some(id);
            hydro.water_table = self.level;
            hydro.salinity = self.salinity;
        }
        for &pos in &self.shore {
            let hydro = &mut world.region_mut(pos).hydrology;
            hydro.state = self.kind.shore_state();
            hydro.body = Some(id);
            hydro.water_table = self.level;
            hydro.salinity = shore_salinity;
        }
        world.bodies.push(BodyOfWater {
            id,
            kind: self.kind,
            origin: self.origin.unwrap_or_default(),
            shore_origin: self.shore.first().copied(),
            level: self.level,
            salinity: self.salinity,
            area: self.interior.len(),
            shore_area: self.shore.len(),
            rivers: Vec::new(),
        });
        self.committed = Some(id);
    }

    fn on_cleanup(&mut self, _world: &mut WorldMap) {
        self.interior.clear();
        self.shore.clear();
        self.origin = None;
    }
}

/// Try to grow one body of water from `origin`; returns its id on success.
pub fn fill_water(
    world: &mut WorldMap,
    origin: RegionPos,
    kind: WaterKind,
    level: f32,
    salinity: Salinity,
    min_size: usize,
    max_size: Option<usize>,
) -> Option<BodyOfWaterId> {
    let mut fill = WaterFill::new(kind, level, salinity, world.config.terrain.land_slack);
    if breadth_first(world, origin, min_size, max_size, &mut fill) {
        fill.committed()
    } else {
        None
    }
}

/// Fill oceans in raster order at sea level. Returns the number created.
pub fn generate_oceans(world: &mut WorldMap) -> usize {
    let params = world.config.hydrology.clone();
    // A map that is entirely sea is still one ocean.
    let min_size = params.min_ocean_size.min(world.area());
    let mut created = 0;
    for y in 0..world.height() {
        for x in 0..world.width() {
            let pos = RegionPos::new(x, y);
            if world.region(pos).hydrology.body.is_some() {
                continue;
            }
            if fill_water(
                world,
                pos,
                WaterKind::Ocean,
                heights::SEA_LEVEL,
                Salinity::Saline,
                min_size,
                params.max_ocean_size,
            )
            .is_some()
            {
                created += 1;
            }
        }
    }
    info!(oceans = created, "filled oceans");
    created
}

/// Regions outside any body of water with no downhill neighbor.
pub fn lake_sites(world: &WorldMap) -> Vec<RegionPos> {
    world
        .regions
        .iter()
        .filter(|(_, r)| r.hydrology.body.is_none() && r.topography.downhill.is_none())
        .map(|(pos, _)| pos)
        .collect()
}

/// Salinity class for a uniform draw on [0, 1].
pub fn lake_salinity(draw: f32, params: &HydrologyParams) -> Salinity {
    if draw < params.briny_threshold {
        Salinity::Briny
    } else if draw < params.saline_threshold {
        Salinity::Saline
    } else if draw < params.brackish_threshold {
        Salinity::Brackish
    } else {
        Salinity::Fresh
    }
}

/// Candidate lake depth for a uniform draw on [0, 1]; small depths dominate.
pub fn lake_depth(draw: f32, params: &HydrologyParams) -> f32 {
    params.min_lake_depth + params.max_lake_depth * (params.lake_depth_squash * (draw - 1.0)).exp()
}

/// Number of fill attempts for a starting depth: one per depth in the
/// shrinking sequence that stays at or above `min_lake_depth`.
///
/// A shrink factor outside (0, 1) never reaches the floor, so it gets a
/// single attempt.
pub fn lake_attempts(depth: f32, params: &HydrologyParams) -> usize {
    if depth.is_nan() || depth < params.min_lake_depth {
        return 0;
    }
    let shrink = params.lake_depth_shrink;
    if !(shrink > 0.0 && shrink < 1.0) {
        return 1;
    }
    ((params.min_lake_depth / depth).ln() / shrink.ln()).floor() as usize + 1
}

/// Probabilistically flood local minima. Returns the number of lakes created.
pub fn generate_lakes(world: &mut WorldMap) -> usize {
    let params = world.config.hydrology.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(world.seeds.lakes);
    let sites = lake_sites(world);
    info!(sites = sites.len(), "processing lake sites");

    let mut created = 0;
    for site in sites {
        if world.region(site).hydrology.body.is_some() {
            continue;
        }
        if rng.gen::<f32>() > params.lake_probability {
            continue;
        }
        let salinity = lake_salinity(rng.gen::<f32>(), &params);
        let mut depth = lake_depth(rng.gen::<f32>(), &params);
        let floor = world.region(site).topography.min_height;

        let mut filled = false;
        for _ in 0..lake_attempts(depth, &params) {
            let made = fill_water(
                world,
                site,
                WaterKind::Lake,
                floor + depth,
                salinity,
                params.min_lake_size,
                Some(params.max_lake_size),
            );
            if made.is_some() {
                created += 1;
                filled = true;
                break;
            }
            depth *= params.lake_depth_shrink;
        }
        if !filled {
            debug!(x = site.x, y = site.y, "abandoned lake site");
        }
    }
    info!(lakes = created, "filled lakes");
    created
}

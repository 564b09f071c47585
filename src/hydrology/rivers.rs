//! River seeding and growth.
//!
//! Rivers start on the shores of oceans and lakes and grow uphill, one point
//! per iteration, until they leave the map, reach a peak, run out of width or
//! collide with a region that cannot carry another river.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::curve::Curve;
use crate::config::HydrologyParams;
use crate::grid::{GridBounds, RegionPos, OFFSETS_8};
use crate::math::Vec2;
use crate::region::{BodyOfWaterId, RiverId};
use crate::search::{breadth_first, RegionVisitor, StepResult};
use crate::world::WorldMap;

// =============================================================================
// RIVER
// =============================================================================

/// A river as a chain of Bezier segments.
///
/// `path`, `control_points` and `widths` always have the same length. Each
/// control point is the forward handle of its path point; a trailing width of
/// zero means the river has stopped growing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct River {
    pub id: RiverId,
    pub path: Vec<Vec2>,
    pub control_points: Vec<Vec2>,
    pub widths: Vec<f32>,
    /// Body of water the river drains into
    pub body: Option<BodyOfWaterId>,
    /// Parent river for tributaries
    pub tributary_of: Option<RiverId>,
}

impl River {
    pub fn new(id: RiverId, start: Vec2, control: Vec2, width: f32, body: Option<BodyOfWaterId>) -> Self {
        Self {
            id,
            path: vec![start],
            control_points: vec![control],
            widths: vec![width],
            body,
            tributary_of: None,
        }
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn last_point(&self) -> Option<Vec2> {
        self.path.last().copied()
    }

    pub fn last_width(&self) -> f32 {
        self.widths.last().copied().unwrap_or(0.0)
    }

    pub fn is_terminated(&self) -> bool {
        self.last_width() <= 0.0
    }

    /// Direction the river was last heading, as a unit vector.
    pub fn heading(&self) -> Vec2 {
        match (self.path.last(), self.control_points.last()) {
            (Some(&p), Some(&c)) => (c - p).normalize(),
            _ => Vec2::ZERO,
        }
    }

    pub fn push_segment(&mut self, point: Vec2, control: Vec2, width: f32) {
        self.path.push(point);
        self.control_points.push(control);
        self.widths.push(width);
    }

    /// Drop the last point; returns it if there was one.
    pub fn retract(&mut self) -> Option<Vec2> {
        self.control_points.pop();
        self.widths.pop();
        self.path.pop()
    }

    /// Stop the river where it is.
    pub fn terminate(&mut self) {
        if let Some(w) = self.widths.last_mut() {
            *w = 0.0;
        }
    }

    pub fn segment_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Bezier curve between path points `i` and `i + 1`.
    pub fn segment_curve(&self, i: usize) -> Option<Curve> {
        if i + 1 >= self.path.len() {
            return None;
        }
        let to = self.path[i + 1];
        Some(Curve::new(
            self.path[i],
            self.control_points[i],
            to * 2.0 - self.control_points[i + 1],
            to,
        ))
    }

    pub fn est_length(&self) -> f32 {
        (0..self.segment_count())
            .filter_map(|i| self.segment_curve(i))
            .map(|c| c.est_curve_length())
            .sum()
    }
}

/// Region containing a continuous map point, if it is on the map.
pub fn region_at<C: GridBounds>(ctx: &C, p: Vec2) -> Option<RegionPos> {
    let (x, y) = (p.x.floor(), p.y.floor());
    if ctx.in_bounds(x as i64, y as i64) {
        Some(RegionPos::new(x as usize, y as usize))
    } else {
        None
    }
}

fn region_center(pos: RegionPos) -> Vec2 {
    Vec2::new(pos.x as f32 + 0.5, pos.y as f32 + 0.5)
}

// =============================================================================
// SEEDING
// =============================================================================

/// Collects a body's shore regions in breadth-first order, walking through the
/// whole body so that separate stretches of shore are all found.
struct ShoreWalk {
    body: BodyOfWaterId,
    shore: Vec<RegionPos>,
}

impl RegionVisitor<WorldMap> for ShoreWalk {
    fn on_process(&mut self, world: &mut WorldMap, pos: RegionPos) -> StepResult {
        let hydro = &world.region(pos).hydrology;
        if hydro.body != Some(self.body) {
            return StepResult::Ignore;
        }
        if hydro.state.is_shore() {
            self.shore.push(pos);
        }
        StepResult::Continue
    }
}

/// Shore regions of a body, breadth-first from its shore origin.
pub fn shore_regions(world: &mut WorldMap, body: BodyOfWaterId) -> Vec<RegionPos> {
    let Some(origin) = world.body(body).shore_origin else {
        return Vec::new();
    };
    let mut walk = ShoreWalk {
        body,
        shore: Vec::new(),
    };
    breadth_first(world, origin, 0, None, &mut walk);
    walk.shore
}

/// True if no point of any existing river lies within `spacing` of `p`.
fn far_from_rivers(world: &WorldMap, p: Vec2, spacing: f32) -> bool {
    world
        .rivers
        .iter()
        .flat_map(|r| r.path.iter())
        .all(|q| q.distance(&p) >= spacing)
}

/// Uphill direction at a region: the gross gradient, or toward the uphill
/// neighbor on flat ground.
fn uphill_direction(world: &WorldMap, pos: RegionPos) -> Vec2 {
    let topo = &world.region(pos).topography;
    let gradient = Vec2::new(topo.gross_height.dx, topo.gross_height.dy).normalize();
    if gradient != Vec2::ZERO {
        return gradient;
    }
    match topo.uphill {
        Some(up) => (region_center(up) - region_center(pos)).normalize(),
        None => Vec2::ZERO,
    }
}

fn add_river(world: &mut WorldMap, mut river: River, pos: RegionPos) -> Option<RiverId> {
    let id = RiverId(world.rivers.len() as u32);
    let limit = world.config.hydrology.max_rivers_per_region;
    let hydro = &mut world.region_mut(pos).hydrology;
    if hydro.river_count() >= limit || !hydro.add_river(id) {
        return None;
    }
    river.id = id;
    if let Some(body) = river.body {
        world.bodies[body.0 as usize].rivers.push(id);
    }
    world.rivers.push(river);
    Some(id)
}

/// Seeding chance after one shore region: back to the floor after a river
/// is placed, otherwise climbing toward certainty. A mouth refused because
/// the region's river slots are full counts as a failed attempt.
fn next_seed_chance(chance: f32, seeded: bool, params: &HydrologyParams) -> f32 {
    if seeded {
        params.river_seed_floor
    } else {
        (chance * params.river_seed_climb).min(1.0)
    }
}

/// Place river mouths along every shore. Returns the number placed.
pub fn seed_rivers(world: &mut WorldMap, rng: &mut ChaCha8Rng) -> usize {
    let params = world.config.hydrology.clone();
    let width_dist = match Exp::new(1.0 / params.river_width_mean) {
        Ok(dist) => dist,
        Err(err) => {
            warn!(%err, "invalid river width distribution, no rivers seeded");
            return 0;
        }
    };

    let mut placed = 0;
    for b in 0..world.bodies.len() {
        let body = BodyOfWaterId(b as u32);
        let mut chance = params.river_seed_floor;
        for pos in shore_regions(world, body) {
            let start = region_center(pos);
            let accepted = rng.gen::<f32>() < chance
                && far_from_rivers(world, start, params.river_spacing);
            let seeded = accepted && {
                let width = (1.0 + width_dist.sample(rng)).floor().min(params.max_river_width);
                let control = start + uphill_direction(world, pos) * (params.river_step / 3.0);
                let river = River::new(RiverId(0), start, control, width, Some(body));
                add_river(world, river, pos).is_some()
            };
            if seeded {
                placed += 1;
            }
            chance = next_seed_chance(chance, seeded, &params);
        }
    }
    info!(rivers = placed, "seeded rivers");
    placed
}

// =============================================================================
// GROWTH
// =============================================================================

/// Why a river stopped during one growth step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthOutcome {
    Grew,
    AlreadyStopped,
    LeftMap,
    ReachedPeak,
    Collided,
    DriedUp,
}

/// Direction toward the 8-neighbor with the smallest height increase, or
/// `None` if the region is a local peak.
fn least_uphill(world: &WorldMap, pos: RegionPos) -> Option<Vec2> {
    let here = world.region(pos).topography.mean_height;
    let mut best: Option<(f32, RegionPos)> = None;
    for (dx, dy) in OFFSETS_8 {
        let Some(n) = world.neighbor(pos, dx, dy) else {
            continue;
        };
        let rise = world.region(n).topography.mean_height - here;
        if rise > 0.0 && best.map_or(true, |(r, _)| rise < r) {
            best = Some((rise, n));
        }
    }
    best.map(|(_, n)| (region_center(n) - region_center(pos)).normalize())
}

/// Remove a river from a region's slots unless another of its points lies there.
fn unregister_if_absent(world: &mut WorldMap, river: usize, pos: RegionPos) {
    let still_there = world.rivers[river]
        .path
        .iter()
        .any(|&p| region_at(&*world, p) == Some(pos));
    if !still_there {
        let id = world.rivers[river].id;
        world.region_mut(pos).hydrology.remove_river(id);
    }
}

/// Advance one river by one step.
pub fn grow_river(world: &mut WorldMap, river: usize, params: &HydrologyParams, rng: &mut ChaCha8Rng) -> GrowthOutcome {
    if world.rivers[river].is_terminated() {
        return GrowthOutcome::AlreadyStopped;
    }
    let Some(last) = world.rivers[river].last_point() else {
        return GrowthOutcome::AlreadyStopped;
    };
    let Some(here) = region_at(&*world, last) else {
        world.rivers[river].terminate();
        return GrowthOutcome::LeftMap;
    };
    let Some(toward_neighbor) = least_uphill(world, here) else {
        world.rivers[river].terminate();
        return GrowthOutcome::ReachedPeak;
    };

    let gross = uphill_direction(world, here);
    let previous = world.rivers[river].heading();
    let [w_gross, w_neighbor, w_previous] = params.river_blend;
    let mut heading = (gross * w_gross + toward_neighbor * w_neighbor + previous * w_previous).normalize();
    if heading == Vec2::ZERO {
        heading = toward_neighbor;
    }
    let step = params.river_step.max(params.min_river_step);
    let next = last + heading * step;

    let Some(dest) = region_at(&*world, next) else {
        world.rivers[river].terminate();
        return GrowthOutcome::LeftMap;
    };

    let id = world.rivers[river].id;
    let hydro = &world.region(dest).hydrology;
    if !hydro.has_river(id) && hydro.river_count() >= params.max_rivers_per_region {
        if world.rivers[river].len() > 1 {
            if let Some(dropped) = world.rivers[river].retract() {
                if let Some(pos) = region_at(&*world, dropped) {
                    unregister_if_absent(world, river, pos);
                }
            }
        }
        world.rivers[river].terminate();
        return GrowthOutcome::Collided;
    }

    // Bend the previous handle halfway toward the new heading for a smooth join.
    let handle = step / 3.0;
    if let Some(c) = world.rivers[river].control_points.last_mut() {
        let bent = (previous + heading).normalize();
        if bent != Vec2::ZERO {
            *c = last + bent * handle;
        }
    }

    let mut width = world.rivers[river].last_width();
    if rng.gen::<f32>() < params.width_decrement_probability {
        width = (width - 1.0).max(0.0);
    }
    world.rivers[river].push_segment(next, next + heading * handle, width);
    world.region_mut(dest).hydrology.add_river(id);

    if width <= 0.0 {
        GrowthOutcome::DriedUp
    } else {
        GrowthOutcome::Grew
    }
}

/// Possibly split off a narrower tributary at a river's newest point.
fn maybe_branch(world: &mut WorldMap, river: usize, params: &HydrologyParams, rng: &mut ChaCha8Rng) {
    let parent = &world.rivers[river];
    if parent.last_width() < 2.0 || rng.gen::<f32>() >= params.branch_probability {
        return;
    }
    let Some(start) = parent.last_point() else {
        return;
    };
    let side: f32 = if rng.gen::<bool>() { 1.0 } else { -1.0 };
    let heading = Vec2::from_angle(parent.heading().angle() + side * std::f32::consts::FRAC_PI_3);
    let mut branch = River::new(
        RiverId(0),
        start,
        start + heading * (params.river_step / 3.0),
        parent.last_width() - 1.0,
        parent.body,
    );
    branch.tributary_of = Some(parent.id);
    if let Some(pos) = region_at(&*world, start) {
        if let Some(id) = add_river(world, branch, pos) {
            debug!(river = id.0, parent = river, "river branched");
        }
    }
}

/// Grow all rivers for `iterations` steps. Tributaries spawned during an
/// iteration start growing on the next one.
pub fn grow_rivers(world: &mut WorldMap, iterations: usize, rng: &mut ChaCha8Rng) {
    let params = world.config.hydrology.clone();
    for iteration in 0..iterations {
        let count = world.rivers.len();
        let mut grew = 0;
        for river in 0..count {
            if grow_river(world, river, &params, rng) == GrowthOutcome::Grew {
                grew += 1;
                maybe_branch(world, river, &params, rng);
            }
        }
        debug!(iteration, grew, rivers = world.rivers.len(), "river growth step");
        if grew == 0 {
            break;
        }
    }
}

/// Seed rivers along every shore and grow them.
pub fn generate_rivers(world: &mut WorldMap) {
    let mut rng = ChaCha8Rng::seed_from_u64(world.seeds.rivers);
    seed_rivers(world, &mut rng);
    let iterations = world.config.hydrology.river_iterations;
    grow_rivers(world, iterations, &mut rng);
    let total: f32 = world.rivers.iter().map(River::est_length).sum();
    info!(rivers = world.rivers.len(), length = total, "grew rivers");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::hydrology::water::generate_oceans;

    /// Sea along the left edge, land rising steadily to the right.
    fn ramp_world(w: usize, h: usize) -> WorldMap {
        let mut config = GenerationConfig::default();
        config.hydrology.min_ocean_size = 4;
        let mut world = WorldMap::new(3, w, h, config);
        for (pos, region) in world.regions.iter_mut() {
            let mean = 14000.0 + 500.0 * pos.x as f32;
            region.topography.mean_height = mean;
            region.topography.min_height = mean - 100.0;
            region.topography.max_height = mean + 100.0;
            region.topography.gross_height.z = mean;
            region.topography.gross_height.dx = 500.0;
        }
        world
    }

    fn widths_non_increasing(river: &River) -> bool {
        river.widths.windows(2).all(|w| w[1] <= w[0])
    }

    #[test]
    fn test_segment_curve_uses_forward_handles() {
        let mut river = River::new(RiverId(0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), 2.0, None);
        river.push_segment(Vec2::new(3.0, 0.0), Vec2::new(4.0, 0.0), 2.0);
        let curve = river.segment_curve(0).unwrap();
        assert_eq!(curve.go_towards, Vec2::new(1.0, 0.0));
        assert_eq!(curve.come_from, Vec2::new(2.0, 0.0));
        assert!((river.est_length() - 3.0).abs() < 1e-5);
        assert!(river.segment_curve(1).is_none());
    }

    #[test]
    fn test_retract_keeps_sequences_aligned() {
        let mut river = River::new(RiverId(0), Vec2::new(0.5, 0.5), Vec2::new(1.0, 0.5), 3.0, None);
        river.push_segment(Vec2::new(1.5, 0.5), Vec2::new(2.0, 0.5), 3.0);
        assert_eq!(river.retract(), Some(Vec2::new(1.5, 0.5)));
        assert_eq!(river.path.len(), 1);
        assert_eq!(river.control_points.len(), 1);
        assert_eq!(river.widths.len(), 1);
        river.terminate();
        assert!(river.is_terminated());
    }

    #[test]
    fn test_shore_walk_finds_every_shore_region() {
        let mut world = ramp_world(8, 5);
        generate_oceans(&mut world);
        let shore = shore_regions(&mut world, BodyOfWaterId(0));
        assert_eq!(shore.len(), 5);
        assert!(shore.iter().all(|p| p.x == 2));
    }

    #[test]
    fn test_seeded_rivers_start_on_shore_and_keep_spacing() {
        let mut world = ramp_world(10, 8);
        world.config.hydrology.river_seed_floor = 1.0;
        generate_oceans(&mut world);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let placed = seed_rivers(&mut world, &mut rng);
        assert!(placed >= 2);
        for river in &world.rivers {
            let start = river.path[0];
            let pos = region_at(&world, start).unwrap();
            assert!(world.region(pos).hydrology.state.is_shore());
            assert!(world.region(pos).hydrology.has_river(river.id));
            assert!(river.last_width() >= 1.0);
            assert!(river.heading().x > 0.9);
        }
        for (i, a) in world.rivers.iter().enumerate() {
            for b in world.rivers.iter().skip(i + 1) {
                assert!(a.path[0].distance(&b.path[0]) >= 2.5);
            }
        }
        assert_eq!(world.body(BodyOfWaterId(0)).rivers.len(), placed);
    }

    #[test]
    fn test_seed_chance_climbs_until_placed() {
        let params = HydrologyParams::default();
        let climbed = next_seed_chance(params.river_seed_floor, false, &params);
        assert!((climbed - params.river_seed_floor * params.river_seed_climb).abs() < 1e-6);
        assert_eq!(next_seed_chance(0.9, false, &params), 1.0);
        assert_eq!(next_seed_chance(0.9, true, &params), params.river_seed_floor);
    }

    #[test]
    fn test_full_shore_regions_take_no_rivers() {
        let mut world = ramp_world(10, 8);
        world.config.hydrology.river_seed_floor = 1.0;
        world.config.hydrology.max_rivers_per_region = 1;
        generate_oceans(&mut world);
        for pos in shore_regions(&mut world, BodyOfWaterId(0)) {
            assert!(world.region_mut(pos).hydrology.add_river(RiverId(99)));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        assert_eq!(seed_rivers(&mut world, &mut rng), 0);
        assert!(world.rivers.is_empty());
        assert!(world.body(BodyOfWaterId(0)).rivers.is_empty());
    }

    #[test]
    fn test_rivers_terminate_and_never_widen() {
        let mut world = ramp_world(12, 8);
        world.config.hydrology.river_seed_floor = 1.0;
        world.config.hydrology.width_decrement_probability = 0.3;
        generate_oceans(&mut world);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        seed_rivers(&mut world, &mut rng);
        grow_rivers(&mut world, 60, &mut rng);
        assert!(!world.rivers.is_empty());
        for river in &world.rivers {
            assert!(river.is_terminated());
            assert!(widths_non_increasing(river));
            // Only the final width can be zero.
            let zeros = river.widths.iter().filter(|&&w| w == 0.0).count();
            assert_eq!(zeros, 1);
            assert_eq!(river.path.len(), river.control_points.len());
            assert!(river.path.iter().all(|&p| region_at(&world, p).is_some()));
        }
    }

    #[test]
    fn test_growth_is_bounded_by_iterations() {
        let mut world = ramp_world(40, 6);
        world.config.hydrology.width_decrement_probability = 0.0;
        world.config.hydrology.branch_probability = 0.0;
        let start = Vec2::new(2.5, 3.5);
        let river = River::new(RiverId(0), start, start + Vec2::new(0.3, 0.0), 3.0, None);
        add_river(&mut world, river, RegionPos::new(2, 3)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        grow_rivers(&mut world, 5, &mut rng);
        assert!(world.rivers[0].path.len() <= 6);
        assert!(world.rivers[0].path.len() > 1);
    }

    #[test]
    fn test_peak_stops_river() {
        let mut world = ramp_world(5, 5);
        for (pos, region) in world.regions.iter_mut() {
            let d = (pos.x as f32 - 2.0).abs() + (pos.y as f32 - 2.0).abs();
            region.topography.mean_height = 17000.0 - 300.0 * d;
        }
        let start = Vec2::new(2.5, 2.5);
        let river = River::new(RiverId(0), start, start + Vec2::new(0.3, 0.0), 2.0, None);
        add_river(&mut world, river, RegionPos::new(2, 2)).unwrap();
        let params = world.config.hydrology.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(grow_river(&mut world, 0, &params, &mut rng), GrowthOutcome::ReachedPeak);
        assert_eq!(world.rivers[0].path.len(), 1);
        assert!(world.rivers[0].is_terminated());
        assert_eq!(grow_river(&mut world, 0, &params, &mut rng), GrowthOutcome::AlreadyStopped);
    }

    #[test]
    fn test_collision_retracts_and_stops() {
        let mut world = ramp_world(10, 5);
        world.config.hydrology.max_rivers_per_region = 1;
        world.config.hydrology.width_decrement_probability = 0.0;
        for y in 0..5 {
            world.region_mut(RegionPos::new(5, y)).hydrology.add_river(RiverId(99));
        }
        let start = Vec2::new(3.5, 2.5);
        let river = River::new(RiverId(0), start, start + Vec2::new(0.3, 0.0), 2.0, None);
        add_river(&mut world, river, RegionPos::new(3, 2)).unwrap();
        let params = world.config.hydrology.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(grow_river(&mut world, 0, &params, &mut rng), GrowthOutcome::Grew);
        let stepped = region_at(&world, world.rivers[0].path[1]).unwrap();
        assert_eq!(stepped.x, 4);
        assert!(world.region(stepped).hydrology.has_river(RiverId(0)));

        assert_eq!(grow_river(&mut world, 0, &params, &mut rng), GrowthOutcome::Collided);
        assert_eq!(world.rivers[0].path.len(), 1);
        assert!(world.rivers[0].is_terminated());
        assert!(!world.region(stepped).hydrology.has_river(RiverId(0)));
        assert!(world.region(RegionPos::new(3, 2)).hydrology.has_river(RiverId(0)));
    }
}

//! Region search engine.
//!
//! Grows a connected patch of the grid from an origin, asking a visitor about
//! each candidate region. The engine tracks only connectivity, visitation and
//! the accepted count; everything else (ownership, side effects) belongs to the
//! visitor, which should commit its changes in [`RegionVisitor::on_finish`]
//! once the whole shape is known to be acceptable.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{trace, warn};

use crate::grid::{GridBounds, RegionPos, OFFSETS_4};

/// Visitor verdict for one candidate region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// Accept the region and expand through its neighbors
    Continue,
    /// Stop expanding but keep everything accepted so far
    Finished,
    /// Terminate and discard everything
    Abort,
    /// Reject this region and keep searching
    Ignore,
}

/// Per-use-case behavior plugged into a traversal.
///
/// `on_cleanup` runs exactly once per traversal, whatever the outcome;
/// `on_finish` runs only when the traversal succeeds, before cleanup.
pub trait RegionVisitor<C> {
    fn on_init(&mut self, _ctx: &mut C, _origin: RegionPos) {}
    fn on_process(&mut self, ctx: &mut C, pos: RegionPos) -> StepResult;
    fn on_finish(&mut self, _ctx: &mut C) {}
    fn on_cleanup(&mut self, _ctx: &mut C) {}
}

/// Shape of a blob traversal.
#[derive(Clone, Copy, Debug)]
pub struct BlobShape {
    /// Keep draining the frontier after the size limit instead of stopping dead.
    ///
    /// `max_size` is a soft limit in this mode: expansion stops once it is
    /// passed, but regions already queued are still processed and accepted,
    /// so a successful traversal may end above `max_size`.
    pub fill_edges: bool,
    /// Frontier is shuffled every `smoothness` accepted regions (<= 1: always)
    pub smoothness: usize,
    pub seed: u64,
}

struct Frontier {
    open: VecDeque<RegionPos>,
    visited: Vec<bool>,
    width: usize,
}

impl Frontier {
    fn new<C: GridBounds>(ctx: &C) -> Self {
        Self {
            open: VecDeque::new(),
            visited: vec![false; ctx.area()],
            width: ctx.width(),
        }
    }

    fn push(&mut self, pos: RegionPos) {
        let idx = pos.y * self.width + pos.x;
        if !self.visited[idx] {
            self.visited[idx] = true;
            self.open.push_back(pos);
        }
    }

    fn expand<C: GridBounds>(&mut self, ctx: &C, pos: RegionPos) {
        for (dx, dy) in OFFSETS_4 {
            if let Some(next) = ctx.neighbor(pos, dx, dy) {
                self.push(next);
            }
        }
    }
}

fn succeed<C, V: RegionVisitor<C>>(ctx: &mut C, visitor: &mut V) -> bool {
    visitor.on_finish(ctx);
    visitor.on_cleanup(ctx);
    true
}

fn fail<C, V: RegionVisitor<C>>(ctx: &mut C, visitor: &mut V) -> bool {
    visitor.on_cleanup(ctx);
    false
}

/// Breadth-first traversal from `origin`.
///
/// Stops when the visitor reports `Finished` or the frontier runs dry, and
/// succeeds only if the accepted count is inside `[min_size, max_size]`
/// (`None` = unbounded).
pub fn breadth_first<C, V>(
    ctx: &mut C,
    origin: RegionPos,
    min_size: usize,
    max_size: Option<usize>,
    visitor: &mut V,
) -> bool
where
    C: GridBounds,
    V: RegionVisitor<C>,
{
    let mut frontier = Frontier::new(ctx);
    if ctx.in_bounds(origin.x as i64, origin.y as i64) {
        frontier.push(origin);
        visitor.on_init(ctx, origin);
    }

    let mut size = 0usize;
    while max_size.map_or(true, |max| size <= max) {
        let Some(pos) = frontier.open.pop_front() else {
            break;
        };
        match visitor.on_process(ctx, pos) {
            StepResult::Abort => return fail(ctx, visitor),
            StepResult::Finished => break,
            StepResult::Ignore => continue,
            StepResult::Continue => {
                size += 1;
                frontier.expand(ctx, pos);
            }
        }
    }

    if max_size.is_some_and(|max| size > max) || size < min_size {
        trace!(size, min_size, ?max_size, "breadth-first traversal out of bounds");
        return fail(ctx, visitor);
    }
    succeed(ctx, visitor)
}

/// Blob-growing traversal: breadth-first with a periodically shuffled
/// frontier, producing organic rather than diamond-shaped patches.
pub fn blob_first<C, V>(
    ctx: &mut C,
    origin: RegionPos,
    min_size: usize,
    max_size: Option<usize>,
    shape: BlobShape,
    visitor: &mut V,
) -> bool
where
    C: GridBounds,
    V: RegionVisitor<C>,
{
    let mut rng = ChaCha8Rng::seed_from_u64(shape.seed);
    let mut frontier = Frontier::new(ctx);
    if ctx.in_bounds(origin.x as i64, origin.y as i64) {
        frontier.push(origin);
        visitor.on_init(ctx, origin);
    }

    let mut size = 0usize;
    let mut stopping = false;
    loop {
        if !shape.fill_edges && max_size.is_some_and(|max| size > max) {
            break;
        }
        let Some(pos) = frontier.open.pop_front() else {
            break;
        };
        match visitor.on_process(ctx, pos) {
            StepResult::Abort => return fail(ctx, visitor),
            StepResult::Finished => {
                if !shape.fill_edges {
                    break;
                }
                size += 1;
                stopping = true;
            }
            StepResult::Ignore => {}
            StepResult::Continue => {
                size += 1;
                if max_size.is_some_and(|max| size > max) {
                    stopping = true;
                }
                if !stopping {
                    frontier.expand(ctx, pos);
                }
                if shape.smoothness <= 1 || size % shape.smoothness == 1 {
                    frontier.open.make_contiguous().shuffle(&mut rng);
                }
            }
        }
    }

    if (!shape.fill_edges && max_size.is_some_and(|max| size > max)) || size < min_size {
        trace!(size, min_size, ?max_size, "blob traversal out of bounds");
        return fail(ctx, visitor);
    }
    succeed(ctx, visitor)
}

/// Repeatedly fill from random valid regions until none are left or `fill`
/// asks to stop.
///
/// `validate` is re-evaluated over the whole grid before every pick, so
/// `fill` is expected to invalidate (at least) the region it is handed.
pub fn fill_with_regions<C, F, G>(ctx: &mut C, mut validate: F, mut fill: G, seed: u64)
where
    C: GridBounds,
    F: FnMut(&C, RegionPos, u64) -> bool,
    G: FnMut(&mut C, RegionPos, u64) -> bool,
{
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let width = ctx.width();
    loop {
        let valid: Vec<RegionPos> = (0..ctx.area())
            .map(|idx| RegionPos::new(idx % width, idx / width))
            .filter(|&pos| validate(ctx, pos, seed))
            .collect();
        if valid.is_empty() {
            break;
        }
        let chosen = valid[rng.gen_range(0..valid.len())];
        if !fill(ctx, chosen, seed) {
            break;
        }
        if validate(ctx, chosen, seed) {
            warn!(x = chosen.x, y = chosen.y, "fill left its origin valid; stopping");
            break;
        }
    }
}

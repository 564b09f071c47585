//! Region topography sampled from the tectonic sheet.
//!
//! Each region takes an `n x n` grid of samples of the sheet heightfield plus
//! local detail noise. The sheet's center value and gradient become the
//! region's gross height, and neighbor comparisons give the downhill/uphill
//! links that lakes and rivers follow.

use noise::Perlin;
use tracing::info;

use crate::grid::{GridBounds, RegionPos, OFFSETS_8};
use crate::math::fbm;
use crate::region::{heights, HeightSample};
use crate::tectonics::TectonicSheet;
use crate::world::WorldMap;

/// Half-width of the central difference used for gross gradients (sheet units).
const GRADIENT_STEP: f32 = 0.25;

/// Map a sheet height (roughly [0, 1]) onto the world height scale.
pub fn sheet_to_height(s: f32) -> f32 {
    let s = s.clamp(0.0, 1.2);
    heights::OCEAN_DEPTHS + s * (heights::MOUNTAIN_TOPS - heights::OCEAN_DEPTHS)
}

/// Continuous map coordinates to sheet coordinates, kept just inside the sheet.
pub fn map_to_sheet(world: &WorldMap, extent: (f32, f32), fx: f32, fy: f32) -> (f32, f32) {
    let (ex, ey) = extent;
    let margin = 1e-3;
    let sx = fx / world.width() as f32 * ex;
    let sy = fy / world.height() as f32 * ey;
    (sx.clamp(margin, (ex - margin).max(margin)), sy.clamp(margin, (ey - margin).max(margin)))
}

/// Fill in every region's heights from the sheet, then link neighbors.
pub fn sample_topography(world: &mut WorldMap, sheet: &TectonicSheet) {
    let terrain = world.config.terrain.clone();
    let detail = Perlin::new(world.seeds.terrain as u32);
    let extent = sheet.extent();
    let n = terrain.samples_per_side.max(1);
    // Sheet units per region, for converting sheet gradients.
    let per_region_x = extent.0 / world.width() as f32;
    let per_region_y = extent.1 / world.height() as f32;
    let height_range = heights::MOUNTAIN_TOPS - heights::OCEAN_DEPTHS;

    for y in 0..world.height() {
        for x in 0..world.width() {
            let mut min = f32::INFINITY;
            let mut max = f32::NEG_INFINITY;
            let mut sum = 0.0;
            for j in 0..n {
                for i in 0..n {
                    let fx = x as f32 + (i as f32 + 0.5) / n as f32;
                    let fy = y as f32 + (j as f32 + 0.5) / n as f32;
                    let (sx, sy) = map_to_sheet(world, extent, fx, fy);
                    let noise = fbm(
                        &detail,
                        (fx * terrain.detail_scale) as f64,
                        (fy * terrain.detail_scale) as f64,
                        4,
                        0.5,
                        2.0,
                    ) as f32;
                    let z = sheet_to_height(sheet.sheet_height(sx, sy)) + noise * terrain.detail_amplitude;
                    min = min.min(z);
                    max = max.max(z);
                    sum += z;
                }
            }

            let (cx, cy) = map_to_sheet(world, extent, x as f32 + 0.5, y as f32 + 0.5);
            let (gx, gy) = sheet.sheet_gradient(cx, cy, GRADIENT_STEP);
            let topo = &mut world.region_mut(RegionPos::new(x, y)).topography;
            topo.min_height = min;
            topo.max_height = max;
            topo.mean_height = sum / (n * n) as f32;
            topo.gross_height = HeightSample {
                z: sheet_to_height(sheet.sheet_height(cx, cy)),
                dx: gx * per_region_x * height_range,
                dy: gy * per_region_y * height_range,
            };
        }
    }

    link_slopes(world);
    let lowest = world
        .regions
        .iter()
        .filter(|(_, r)| r.topography.downhill.is_none())
        .count();
    info!(local_minima = lowest, "sampled region topography");
}

/// Set each region's downhill (lowest strictly lower) and uphill (highest
/// strictly higher) 8-neighbor by mean height.
pub fn link_slopes(world: &mut WorldMap) {
    for pos in world.regions.positions().collect::<Vec<_>>() {
        let here = world.region(pos).topography.mean_height;
        let mut downhill: Option<(f32, RegionPos)> = None;
        let mut uphill: Option<(f32, RegionPos)> = None;
        for (dx, dy) in OFFSETS_8 {
            let Some(n) = world.neighbor(pos, dx, dy) else {
                continue;
            };
            let h = world.region(n).topography.mean_height;
            if h < here && downhill.map_or(true, |(best, _)| h < best) {
                downhill = Some((h, n));
            }
            if h > here && uphill.map_or(true, |(best, _)| h > best) {
                uphill = Some((h, n));
            }
        }
        let topo = &mut world.region_mut(pos).topography;
        topo.downhill = downhill.map(|(_, n)| n);
        topo.uphill = uphill.map(|(_, n)| n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, TectonicParams};
    use crate::tectonics::generate_tectonics;

    #[test]
    fn test_sheet_to_height_scale() {
        assert_eq!(sheet_to_height(0.0), heights::OCEAN_DEPTHS);
        assert_eq!(sheet_to_height(1.0), heights::MOUNTAIN_TOPS);
        let sea = (heights::SEA_LEVEL - heights::OCEAN_DEPTHS) / (heights::MOUNTAIN_TOPS - heights::OCEAN_DEPTHS);
        assert!((sheet_to_height(sea) - heights::SEA_LEVEL).abs() < 0.5);
        assert_eq!(sheet_to_height(-3.0), heights::OCEAN_DEPTHS);
    }

    #[test]
    fn test_links_point_down_and_up() {
        let mut world = WorldMap::new(1, 3, 3, GenerationConfig::default());
        for (pos, region) in world.regions.iter_mut() {
            region.topography.mean_height = (pos.x + 3 * pos.y) as f32;
        }
        link_slopes(&mut world);
        let center = &world.region(RegionPos::new(1, 1)).topography;
        assert_eq!(center.downhill, Some(RegionPos::new(0, 0)));
        assert_eq!(center.uphill, Some(RegionPos::new(2, 2)));
        assert!(world.region(RegionPos::new(0, 0)).topography.downhill.is_none());
        assert!(world.region(RegionPos::new(2, 2)).topography.uphill.is_none());
        assert_eq!(world.find_valley(RegionPos::new(2, 2)), RegionPos::new(0, 0));
    }

    #[test]
    fn test_flat_world_has_no_links() {
        let mut world = WorldMap::new(1, 4, 4, GenerationConfig::default());
        link_slopes(&mut world);
        assert!(world
            .regions
            .iter()
            .all(|(_, r)| r.topography.downhill.is_none() && r.topography.uphill.is_none()));
    }

    #[test]
    fn test_sampled_heights_are_ordered() {
        let config = GenerationConfig::small_test();
        let params: TectonicParams = config.tectonics.clone();
        let mut world = WorldMap::new(4, 16, 8, config);
        let sheet = generate_tectonics(16, 8, world.seeds.tectonics, &params);
        sample_topography(&mut world, &sheet);
        for (_, region) in world.regions.iter() {
            let topo = &region.topography;
            assert!(topo.min_height.is_finite() && topo.max_height.is_finite());
            assert!(topo.min_height <= topo.mean_height + 1e-3);
            assert!(topo.mean_height <= topo.max_height + 1e-3);
            assert!(topo.gross_height.dx.is_finite() && topo.gross_height.dy.is_finite());
        }
    }
}

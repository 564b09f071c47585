//! Diagnostic PNG rendering of a generated world map.
//!
//! Every map is drawn at `scale` pixels per region. `render_*` functions build
//! the image in memory, `export_*` functions also write it to disk.

use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;
use tracing::info;

use crate::grid::GridBounds;
use crate::region::{heights, HydroState, Salinity};
use crate::world::WorldMap;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to create output directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Spectral colormap (matplotlib style): dark blue -> cyan -> green -> yellow -> orange -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],
        [0.20, 0.53, 0.74],
        [0.40, 0.76, 0.65],
        [0.67, 0.87, 0.64],
        [0.90, 0.96, 0.60],
        [1.00, 1.00, 0.75],
        [1.00, 0.88, 0.55],
        [0.99, 0.68, 0.38],
        [0.96, 0.43, 0.26],
        [0.84, 0.24, 0.31],
        [0.62, 0.00, 0.26],
    ];

    let t_scaled = t.clamp(0.0, 1.0) * 10.0;
    let idx = (t_scaled as usize).min(9);
    let frac = t_scaled - idx as f32;
    let (c1, c2) = (colors[idx], colors[idx + 1]);
    [0, 1, 2].map(|i| ((c1[i] + (c2[i] - c1[i]) * frac) * 255.0) as u8)
}

fn lerp_color(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [0, 1, 2].map(|i| (a[i] as f32 + (b[i] as f32 - a[i] as f32) * t) as u8)
}

/// Fill a `scale x scale` block per region with the color `f` picks for it.
fn render_regions(world: &WorldMap, scale: u32, f: impl Fn(&WorldMap, usize, usize) -> [u8; 3]) -> RgbImage {
    let scale = scale.max(1);
    let mut img: RgbImage = ImageBuffer::new(world.width() as u32 * scale, world.height() as u32 * scale);
    for y in 0..world.height() {
        for x in 0..world.width() {
            let color = Rgb(f(world, x, y));
            for py in 0..scale {
                for px in 0..scale {
                    img.put_pixel(x as u32 * scale + px, y as u32 * scale + py, color);
                }
            }
        }
    }
    img
}

/// Mean region height on the spectral colormap, ocean depths to mountain tops.
pub fn render_heightmap(world: &WorldMap, scale: u32) -> RgbImage {
    render_regions(world, scale, |world, x, y| {
        let h = world.regions.get_checked(x as i64, y as i64).map_or(0.0, |r| r.topography.mean_height);
        spectral_colormap((h - heights::OCEAN_DEPTHS) / (heights::MOUNTAIN_TOPS - heights::OCEAN_DEPTHS))
    })
}

fn hydrology_color(world: &WorldMap, x: usize, y: usize) -> [u8; 3] {
    let Some(region) = world.regions.get_checked(x as i64, y as i64) else {
        return [0, 0, 0];
    };
    let hydro = &region.hydrology;
    let land_t = (region.topography.mean_height - heights::SEA_LEVEL) / (heights::MOUNTAIN_TOPS - heights::SEA_LEVEL);
    match hydro.state {
        HydroState::Ocean => [20, 50, 120],
        HydroState::OceanShore => [60, 110, 170],
        HydroState::Lake | HydroState::LakeShore => match hydro.salinity {
            Salinity::Fresh => [70, 150, 210],
            Salinity::Brackish => [90, 160, 170],
            Salinity::Saline => [120, 170, 160],
            Salinity::Briny => [170, 180, 150],
        },
        HydroState::Land => lerp_color([110, 150, 80], [200, 190, 170], land_t),
    }
}

/// Water bodies by state and salinity on shaded land, with rivers drawn
/// along their curves.
pub fn render_hydrology(world: &WorldMap, scale: u32) -> RgbImage {
    let scale = scale.max(1);
    let mut img = render_regions(world, scale, hydrology_color);
    let river_color = Rgb([30, 90, 200]);
    let (w, h) = (img.width() as f32, img.height() as f32);
    for river in &world.rivers {
        for i in 0..river.segment_count() {
            let Some(curve) = river.segment_curve(i) else {
                continue;
            };
            let steps = (curve.est_curve_length() * scale as f32 * 2.0).ceil().max(2.0) as usize;
            for s in 0..=steps {
                let p = curve.point_on_curve(s as f32 / steps as f32);
                let (px, py) = (p.x * scale as f32, p.y * scale as f32);
                if px >= 0.0 && py >= 0.0 && px < w && py < h {
                    img.put_pixel(px as u32, py as u32, river_color);
                }
            }
        }
    }
    img
}

/// Annual precipitation from dry (brown) to wet (blue), capped at `max_mm`.
pub fn render_precipitation(world: &WorldMap, scale: u32, max_mm: f32) -> RgbImage {
    render_regions(world, scale, |world, x, y| {
        let p = world
            .regions
            .get_checked(x as i64, y as i64)
            .map_or(0.0, |r| r.weather.total_precipitation);
        let t = p / max_mm.max(1.0);
        if t < 0.5 {
            lerp_color([170, 120, 60], [220, 220, 140], t * 2.0)
        } else {
            lerp_color([220, 220, 140], [30, 80, 200], (t - 0.5) * 2.0)
        }
    })
}

/// Annual mean temperature on the spectral colormap, -30 to 40 deg C.
pub fn render_temperature(world: &WorldMap, scale: u32) -> RgbImage {
    render_regions(world, scale, |world, x, y| {
        let t = world.regions.get_checked(x as i64, y as i64).map_or(0.0, |r| r.weather.mean_temp);
        spectral_colormap((t + 30.0) / 70.0)
    })
}

/// Write the four diagnostic maps as `<prefix>_<name>.png`.
pub fn export_all(world: &WorldMap, prefix: &str, scale: u32) -> Result<Vec<String>, ExportError> {
    if let Some(parent) = Path::new(prefix).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let maps = [
        ("heightmap", render_heightmap(world, scale)),
        ("hydrology", render_hydrology(world, scale)),
        ("precipitation", render_precipitation(world, scale, 3000.0)),
        ("temperature", render_temperature(world, scale)),
    ];
    let mut written = Vec::with_capacity(maps.len());
    for (name, img) in maps {
        let path = format!("{prefix}_{name}.png");
        img.save(&path)?;
        info!(path = %path, "wrote map");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::grid::RegionPos;
    use crate::hydrology::River;
    use crate::math::Vec2;
    use crate::region::RiverId;

    #[test]
    fn test_spectral_endpoints() {
        assert_eq!(spectral_colormap(0.0), [94, 79, 163]);
        assert_eq!(spectral_colormap(1.0), [158, 0, 66]);
        assert_eq!(spectral_colormap(-4.0), spectral_colormap(0.0));
    }

    #[test]
    fn test_render_dimensions_follow_scale() {
        let world = WorldMap::new(1, 5, 3, GenerationConfig::default());
        let img = render_heightmap(&world, 4);
        assert_eq!((img.width(), img.height()), (20, 12));
        let img = render_temperature(&world, 0);
        assert_eq!((img.width(), img.height()), (5, 3));
    }

    #[test]
    fn test_hydrology_colors_water_and_rivers() {
        let mut world = WorldMap::new(1, 6, 2, GenerationConfig::default());
        world.region_mut(RegionPos::new(0, 0)).hydrology.state = HydroState::Ocean;
        let mut river = River::new(RiverId(0), Vec2::new(2.5, 1.0), Vec2::new(3.0, 1.0), 2.0, None);
        river.push_segment(Vec2::new(4.5, 1.0), Vec2::new(5.0, 1.0), 2.0);
        world.rivers.push(river);

        let img = render_hydrology(&world, 2);
        assert_eq!(img.get_pixel(0, 0).0, [20, 50, 120]);
        assert_eq!(img.get_pixel(7, 2).0, [30, 90, 200]);
        assert_ne!(img.get_pixel(11, 0).0, [30, 90, 200]);
    }
}

//! Tectonic heightfield synthesis.
//!
//! A coarse triangulated sheet of mass points is given continents and ridges,
//! torn and pushed along random seams, relaxed, squared back onto its
//! rectangle and finally sampled for per-region heights.

pub mod lattice;
pub mod sheet;

pub use sheet::{MassPoint, TectonicSheet};

use tracing::info;

use crate::config::TectonicParams;

/// Sheet lattice size for a world map, in lattice units.
///
/// The sheet is `sheet_scale` times coarser than the region grid; its width is
/// doubled because points in a row sit two units apart.
pub fn sheet_dimensions(map_width: usize, map_height: usize, params: &TectonicParams) -> (usize, usize) {
    let width = ((2.0 * map_width as f32) / params.sheet_scale).round() as usize;
    let height = (map_height as f32 / params.sheet_scale).round() as usize;
    (width.max(4), height.max(2))
}

/// Build and relax the tectonic sheet for a `map_width x map_height` world.
pub fn generate_tectonics(map_width: usize, map_height: usize, seed: u64, params: &TectonicParams) -> TectonicSheet {
    let (width, height) = sheet_dimensions(map_width, map_height, params);
    info!(width, height, "building tectonic sheet");
    let mut sheet = TectonicSheet::new(width, height, seed);
    sheet.run_pipeline(params);
    info!(folded = sheet.folded_triangles(), "tectonic sheet relaxed");
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_dimensions_scale_with_map() {
        let params = TectonicParams::default();
        assert_eq!(sheet_dimensions(64, 32, &params), (40, 10));
        // Tiny maps still get a usable lattice.
        assert_eq!(sheet_dimensions(4, 4, &params), (4, 2));
    }

    #[test]
    fn test_generated_heights_are_finite() {
        let params = TectonicParams {
            seam_count: 2,
            settle_iterations: 2,
            untangle_iterations: 1,
            ..Default::default()
        };
        let sheet = generate_tectonics(24, 12, 5, &params);
        assert!(sheet.points().iter().all(|p| p.z.is_finite()));
        let (w, h) = sheet.extent();
        let z = sheet.sheet_height(w / 2.0, h / 2.0);
        assert!(z.is_finite());
    }
}

//! The tectonic sheet: a triangulated mass-point mesh that is pushed, pulled
//! and relaxed into a plausible heightfield.

use noise::core::worley::ReturnType;
use noise::{NoiseFn, Perlin, Worley};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use super::lattice;
use crate::config::TectonicParams;
use crate::math::{smoothstep, Vec2};

/// Barycentric weights this far below zero still count as inside a triangle.
const CONTAINMENT_EPSILON: f32 = 1e-5;

/// One mass point of the sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MassPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Accumulated spring force (settle) or neighbor position sum (untangle)
    force: Vec2,
    /// Contributions accumulated into `force` during averaging
    avg_count: u32,
    pinned: bool,
}

impl MassPoint {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Relaxable triangulated heightfield on an alternating-row simplex lattice.
pub struct TectonicSheet {
    cols: usize,
    rows: usize,
    points: Vec<MassPoint>,
    neighbors: Vec<Vec<usize>>,
    snapshot: Option<Vec<f32>>,
    rng: ChaCha8Rng,
}

impl TectonicSheet {
    /// Allocate a `(width / 2 + 1) x (height + 1)` lattice of flat, resting points.
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        let cols = width / 2 + 1;
        let rows = height + 1;
        let mut points = Vec::with_capacity(cols * rows);
        let mut neighbors = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = lattice::rest_position(col, row);
                points.push(MassPoint {
                    x,
                    y,
                    ..Default::default()
                });
                neighbors.push(lattice::point_neighbors(col, row, cols, rows));
            }
        }
        Self {
            cols,
            rows,
            points,
            neighbors,
            snapshot: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn points(&self) -> &[MassPoint] {
        &self.points
    }

    /// Planar extent of the sheet once its edges are stretched square.
    pub fn extent(&self) -> (f32, f32) {
        (
            (2 * self.cols.saturating_sub(1)) as f32,
            self.rows.saturating_sub(1) as f32,
        )
    }

    fn normalizer(&self) -> f64 {
        let (w, h) = self.extent();
        w.max(h).max(1.0) as f64
    }

    fn next_noise_seed(&mut self) -> u32 {
        self.rng.gen()
    }

    // ===== HEIGHT SOURCES =====

    /// Perturb planar positions with coherent noise.
    pub fn rustle(&mut self, strength: f32, scale: f32) {
        let nx = Perlin::new(self.next_noise_seed());
        let ny = Perlin::new(self.next_noise_seed());
        let norm = self.normalizer();
        let scale = scale as f64;
        for p in self.points.iter_mut().filter(|p| !p.pinned) {
            let u = p.x as f64 / norm * scale;
            let v = p.y as f64 / norm * scale;
            p.x += strength * nx.get([u, v]) as f32;
            p.y += strength * ny.get([u, v]) as f32;
        }
    }

    /// Add a distorted sine-product continent field.
    pub fn add_continents(&mut self, strength: f32, scale: f32) {
        let distortion = Perlin::new(self.next_noise_seed());
        let phase_x: f64 = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let phase_y: f64 = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let norm = self.normalizer();
        let scale = scale as f64;
        for p in self.points.iter_mut() {
            let u = p.x as f64 / norm * scale;
            let v = p.y as f64 / norm * scale;
            let dsx = 0.6 * distortion.get([u * 0.5, v * 0.5]);
            let dsy = 0.6 * distortion.get([v * 0.5, u * 0.5]);
            let a = u * std::f64::consts::TAU + phase_x;
            let b = v * std::f64::consts::TAU + phase_y;
            let value = (a + dsx).cos() * (b + dsy).sin()
                + ((a - dsx) * 1.8).cos() * ((b - dsy) * 1.8).sin();
            p.z += strength * (value / 2.0) as f32;
        }
    }

    /// Add cell-noise ridges, faded in and out by a reshaped auxiliary field.
    pub fn add_ridges(&mut self, strength: f32, scale: f32) {
        let cells = Worley::new(self.next_noise_seed()).set_return_type(ReturnType::Distance);
        let aux = Perlin::new(self.next_noise_seed());
        let norm = self.normalizer();
        let scale = scale as f64;
        for p in self.points.iter_mut() {
            let u = p.x as f64 / norm * scale;
            let v = p.y as f64 / norm * scale;
            let distance = ((cells.get([u, v]) as f32 + 1.0) / 2.0).clamp(0.0, 1.0);
            let ridge = distance * distance;
            let mask = smoothstep((aux.get([u * 0.7, v * 0.7]) as f32 + 1.0) / 2.0);
            p.z += strength * ridge * mask * mask;
        }
    }

    // ===== SNAPSHOTS =====

    pub fn snapshot(&mut self) {
        self.snapshot = Some(self.points.iter().map(|p| p.z).collect());
    }

    /// Blend the snapshot heights back in (normalized to the current range)
    /// and discard the snapshot.
    pub fn blend_snapshot(&mut self, weight: f32) {
        let Some(snapshot) = self.snapshot.take() else {
            warn!("blend_snapshot called without a snapshot");
            return;
        };
        let (lo, hi) = min_max(snapshot.iter().copied());
        let (cur_lo, cur_hi) = min_max(self.points.iter().map(|p| p.z));
        for (p, s) in self.points.iter_mut().zip(snapshot) {
            let normalized = if hi - lo > f32::EPSILON { (s - lo) / (hi - lo) } else { 0.5 };
            let rescaled = cur_lo + normalized * (cur_hi - cur_lo);
            p.z = (1.0 - weight) * p.z + weight * rescaled;
        }
    }

    // ===== DEFORMATION =====

    /// Push points away from (positive strength) or pull them toward (negative)
    /// the segment `from`-`to`. Pulling raises the crust, pushing rifts it.
    pub fn seam(&mut self, from: Vec2, to: Vec2, distance: f32, strength: f32, shape: f32, uplift: f32) {
        for p in self.points.iter_mut().filter(|p| !p.pinned) {
            let pos = p.position();
            let closest = closest_on_segment(pos, from, to);
            let offset = pos - closest;
            let d = offset.length();
            if d >= distance || d < 1e-6 {
                continue;
            }
            let falloff = (1.0 - d / distance).powf(shape);
            let moved = pos + offset.normalize() * (strength * distance * falloff);
            p.x = moved.x;
            p.y = moved.y;
            p.z -= strength.signum() * uplift * falloff;
        }
    }

    /// Spring relaxation toward each edge's rest length.
    pub fn settle(&mut self, iterations: usize, strength: f32) {
        for _ in 0..iterations {
            for p in self.points.iter_mut() {
                p.force = Vec2::ZERO;
            }
            for i in 0..self.points.len() {
                for &j in self.neighbors[i].iter().filter(|&&j| j > i) {
                    let delta = self.points[j].position() - self.points[i].position();
                    let len = delta.length();
                    if len < 1e-6 {
                        continue;
                    }
                    let rest = self.rest_length(i, j);
                    let pull = delta * (strength * 0.5 * (len - rest) / len);
                    self.points[i].force = self.points[i].force + pull;
                    self.points[j].force = self.points[j].force - pull;
                }
            }
            for p in self.points.iter_mut().filter(|p| !p.pinned) {
                p.x += p.force.x;
                p.y += p.force.y;
            }
        }
    }

    /// Laplacian averaging of interior points toward their neighbor centroid.
    pub fn untangle(&mut self, iterations: usize, strength: f32) {
        for _ in 0..iterations {
            for p in self.points.iter_mut() {
                p.force = Vec2::ZERO;
                p.avg_count = 0;
            }
            for i in 0..self.points.len() {
                for &j in self.neighbors[i].iter().filter(|&&j| j > i) {
                    let pi = self.points[i].position();
                    let pj = self.points[j].position();
                    self.points[i].force = self.points[i].force + pj;
                    self.points[i].avg_count += 1;
                    self.points[j].force = self.points[j].force + pi;
                    self.points[j].avg_count += 1;
                }
            }
            for p in self.points.iter_mut() {
                if p.pinned || p.avg_count < 6 {
                    continue;
                }
                let centroid = p.force * (1.0 / p.avg_count as f32);
                let moved = p.position().lerp(&centroid, strength);
                p.x = moved.x;
                p.y = moved.y;
            }
        }
    }

    /// Rustle, then settle and untangle.
    pub fn crumple(&mut self, params: &TectonicParams) {
        for (strength, scale) in params.rustle_strengths.iter().zip(&params.rustle_scales) {
            self.rustle(*strength * 0.5, *scale);
        }
        self.settle(params.settle_iterations, params.settle_strength);
        self.untangle(params.untangle_iterations, params.untangle_strength);
    }

    /// Snap the boundary back onto the sheet rectangle, then relax the interior
    /// with the edges pinned.
    pub fn stretch(&mut self, params: &TectonicParams) {
        let (width, height) = self.extent();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let on_edge = row == 0 || row + 1 == self.rows || col == 0 || col + 1 == self.cols;
                if !on_edge {
                    continue;
                }
                let p = &mut self.points[lattice::point_index(col, row, self.cols)];
                if col == 0 {
                    p.x = 0.0;
                } else if col + 1 == self.cols {
                    p.x = width;
                } else {
                    p.x = p.x.clamp(0.0, width);
                }
                if row == 0 {
                    p.y = 0.0;
                } else if row + 1 == self.rows {
                    p.y = height;
                } else {
                    p.y = p.y.clamp(0.0, height);
                }
                p.pinned = true;
            }
        }
        self.settle(params.settle_iterations, params.settle_strength);
        self.untangle(params.untangle_iterations, params.untangle_strength);
        for p in self.points.iter_mut() {
            p.pinned = false;
        }
    }

    /// Normalize heights to [0, 1], then compress the low tail toward `new_min`
    /// and stretch the high tail toward `new_max`.
    pub fn squash(&mut self, low_cutoff: f32, new_min: f32, high_cutoff: f32, new_max: f32) {
        let (lo, hi) = min_max(self.points.iter().map(|p| p.z));
        let range = hi - lo;
        for p in self.points.iter_mut() {
            let h = if range > f32::EPSILON { (p.z - lo) / range } else { 0.5 };
            p.z = squash_value(h, low_cutoff, new_min, high_cutoff, new_max);
        }
    }

    fn rest_length(&self, i: usize, j: usize) -> f32 {
        let (ci, ri) = lattice::point_coords(i, self.cols);
        let (cj, rj) = lattice::point_coords(j, self.cols);
        let a = lattice::rest_position(ci, ri);
        let b = lattice::rest_position(cj, rj);
        Vec2::new(a.0, a.1).distance(&Vec2::new(b.0, b.1))
    }

    // ===== QUERIES =====

    /// Barycentric weights of `(x, y)` in triangle `tri`, if non-degenerate.
    pub fn barycentric(&self, tri: usize, x: f32, y: f32) -> Option<[f32; 3]> {
        let [a, b, c] = lattice::triangle_corners(tri, self.cols).map(|i| self.points[i].position());
        let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
        if det.abs() < 1e-9 {
            return None;
        }
        let wa = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / det;
        let wb = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / det;
        Some([wa, wb, 1.0 - wa - wb])
    }

    /// Interpolated height at sheet coordinates `(x, y)`.
    ///
    /// Triangles are scanned linearly, starting from the one whose rest
    /// footprint holds the point and widening outward until every triangle has
    /// been tried. A miss is logged and answered with the height of the nearest
    /// mass point.
    pub fn sheet_height(&self, x: f32, y: f32) -> f32 {
        let count = lattice::triangle_count(self.cols, self.rows);
        let hint = lattice::triangle_hint(x, y, self.cols, self.rows);
        let mut offset = 0;
        while offset <= hint || hint + offset < count {
            if hint + offset < count {
                if let Some(z) = self.interpolate_in(hint + offset, x, y) {
                    return z;
                }
            }
            if offset > 0 && offset <= hint {
                if let Some(z) = self.interpolate_in(hint - offset, x, y) {
                    return z;
                }
            }
            offset += 1;
        }
        warn!(x, y, "no sheet triangle contains point; using nearest mass point");
        self.nearest_point_height(x, y)
    }

    fn interpolate_in(&self, tri: usize, x: f32, y: f32) -> Option<f32> {
        let w = self.barycentric(tri, x, y)?;
        if w.iter().any(|&wi| wi < -CONTAINMENT_EPSILON) {
            return None;
        }
        let corners = lattice::triangle_corners(tri, self.cols);
        Some(
            w[0] * self.points[corners[0]].z
                + w[1] * self.points[corners[1]].z
                + w[2] * self.points[corners[2]].z,
        )
    }

    fn nearest_point_height(&self, x: f32, y: f32) -> f32 {
        let target = Vec2::new(x, y);
        self.points
            .iter()
            .min_by(|a, b| {
                a.position()
                    .distance(&target)
                    .total_cmp(&b.position().distance(&target))
            })
            .map(|p| p.z)
            .unwrap_or(0.0)
    }

    /// Height gradient by central differences with half-width `h`.
    pub fn sheet_gradient(&self, x: f32, y: f32, h: f32) -> (f32, f32) {
        let dx = (self.sheet_height(x + h, y) - self.sheet_height(x - h, y)) / (2.0 * h);
        let dy = (self.sheet_height(x, y + h) - self.sheet_height(x, y - h)) / (2.0 * h);
        (dx, dy)
    }

    /// Count triangles whose winding flipped relative to the rest lattice.
    pub fn folded_triangles(&self) -> usize {
        let count = lattice::triangle_count(self.cols, self.rows);
        (0..count)
            .filter(|&tri| {
                let corners = lattice::triangle_corners(tri, self.cols);
                let rest = corners.map(|i| {
                    let (c, r) = lattice::point_coords(i, self.cols);
                    let (x, y) = lattice::rest_position(c, r);
                    Vec2::new(x, y)
                });
                let now = corners.map(|i| self.points[i].position());
                signed_area(&rest).signum() != signed_area(&now).signum()
            })
            .count()
    }

    // ===== PIPELINE =====

    /// Run the fixed pass sequence that turns a flat lattice into terrain.
    pub fn run_pipeline(&mut self, params: &TectonicParams) {
        for (strength, scale) in params.rustle_strengths.iter().zip(&params.rustle_scales) {
            self.rustle(*strength, *scale);
        }
        for (strength, scale) in params.continent_strengths.iter().zip(&params.continent_scales) {
            self.add_continents(*strength, *scale);
        }
        for (strength, scale) in params.ridge_strengths.iter().zip(&params.ridge_scales) {
            self.add_ridges(*strength, *scale);
        }
        self.snapshot();

        let (width, height) = self.extent();
        let reach = params.seam_distance * width.max(height);
        for i in 0..params.seam_count {
            let from = Vec2::new(self.rng.gen_range(0.0..=width), self.rng.gen_range(0.0..=height));
            let to = Vec2::new(self.rng.gen_range(0.0..=width), self.rng.gen_range(0.0..=height));
            let strength = self.rng.gen_range(-1.0..=1.0) * params.seam_strength;
            self.seam(from, to, reach, strength, params.seam_shape, params.seam_uplift);
            self.crumple(params);
            debug!(seam = i, folded = self.folded_triangles(), "seam crumpled");
        }

        self.stretch(params);
        self.squash(
            params.squash_low_cutoff,
            params.squash_new_min,
            params.squash_high_cutoff,
            params.squash_new_max,
        );
        self.blend_snapshot(params.snapshot_blend);
    }
}

/// Curve remap used by [`TectonicSheet::squash`] on a normalized height.
pub fn squash_value(h: f32, low_cutoff: f32, new_min: f32, high_cutoff: f32, new_max: f32) -> f32 {
    if h < low_cutoff && low_cutoff > 0.0 {
        let t = h / low_cutoff;
        // ease-out: flat near the bottom, meets the identity at the cutoff
        new_min + (low_cutoff - new_min) * (1.0 - (1.0 - t) * (1.0 - t))
    } else if h > high_cutoff && high_cutoff < 1.0 {
        let t = (h - high_cutoff) / (1.0 - high_cutoff);
        high_cutoff + (new_max - high_cutoff) * t.powf(1.5)
    } else {
        h
    }
}

fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len2 = ab.dot(&ab);
    if len2 < 1e-12 {
        return a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

fn signed_area(corners: &[Vec2; 3]) -> f32 {
    let [a, b, c] = corners;
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

fn min_max(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sloped_sheet() -> TectonicSheet {
        let mut sheet = TectonicSheet::new(8, 4, 1);
        for p in sheet.points.iter_mut() {
            p.z = p.x * 0.5 + p.y;
        }
        sheet
    }

    #[test]
    fn test_sheet_dimensions() {
        let sheet = TectonicSheet::new(10, 6, 42);
        assert_eq!(sheet.cols(), 6);
        assert_eq!(sheet.rows(), 7);
        assert_eq!(sheet.points().len(), 42);
        assert!(sheet.points().iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_height_interpolates_linear_field_exactly() {
        let sheet = sloped_sheet();
        for &(x, y) in &[(1.0, 0.5), (3.3, 2.2), (5.9, 3.7), (2.0, 1.0)] {
            let expected = x * 0.5 + y;
            assert!((sheet.sheet_height(x, y) - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_shared_vertex_heights_agree() {
        let mut sheet = TectonicSheet::new(8, 4, 9);
        sheet.add_continents(1.0, 1.5);
        // Every triangle touching a vertex reproduces that vertex's height.
        let count = lattice::triangle_count(sheet.cols, sheet.rows);
        for tri in 0..count {
            for corner in lattice::triangle_corners(tri, sheet.cols) {
                let p = &sheet.points[corner];
                let w = sheet.barycentric(tri, p.x, p.y).unwrap();
                let corners = lattice::triangle_corners(tri, sheet.cols);
                let z: f32 = (0..3).map(|k| w[k] * sheet.points[corners[k]].z).sum();
                assert!((z - p.z).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_height_is_continuous() {
        let mut sheet = TectonicSheet::new(12, 6, 5);
        sheet.add_continents(1.0, 1.3);
        sheet.add_ridges(0.3, 3.0);
        let mut x = 1.0;
        while x < 9.5 {
            let a = sheet.sheet_height(x, 2.5);
            let b = sheet.sheet_height(x + 0.001, 2.5);
            assert!((a - b).abs() < 0.01, "jump at x = {x}");
            x += 0.1;
        }
    }

    #[test]
    fn test_outside_point_falls_back_to_nearest() {
        let sheet = sloped_sheet();
        let z = sheet.sheet_height(-50.0, -50.0);
        assert_eq!(z, sheet.points[0].z);
    }

    #[test]
    fn test_squash_curve() {
        // Mid-range untouched, ends remapped, continuous at the cutoffs.
        assert_eq!(squash_value(0.5, 0.2, 0.1, 0.8, 1.2), 0.5);
        assert!((squash_value(0.0, 0.2, 0.1, 0.8, 1.2) - 0.1).abs() < 1e-6);
        assert!((squash_value(1.0, 0.2, 0.1, 0.8, 1.2) - 1.2).abs() < 1e-6);
        assert!((squash_value(0.1999, 0.2, 0.1, 0.8, 1.2) - 0.2).abs() < 1e-3);
        assert!((squash_value(0.8001, 0.2, 0.1, 0.8, 1.2) - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_settle_keeps_rest_lattice_still() {
        let mut sheet = TectonicSheet::new(8, 4, 3);
        let before: Vec<_> = sheet.points.iter().map(|p| p.position()).collect();
        sheet.settle(5, 0.3);
        for (p, b) in sheet.points.iter().zip(before) {
            assert!(p.position().distance(&b) < 1e-5);
        }
    }

    #[test]
    fn test_untangle_restores_displaced_interior_point() {
        let mut sheet = TectonicSheet::new(8, 6, 3);
        let idx = lattice::point_index(2, 3, sheet.cols);
        let rest = sheet.points[idx].position();
        sheet.points[idx].x += 0.8;
        sheet.untangle(100, 0.5);
        assert!(sheet.points[idx].position().distance(&rest) < 0.01);
    }

    #[test]
    fn test_stretch_pins_boundary_to_rectangle() {
        let mut sheet = TectonicSheet::new(10, 6, 11);
        sheet.rustle(0.4, 5.0);
        sheet.stretch(&TectonicParams::default());
        let (w, h) = sheet.extent();
        for row in 0..sheet.rows {
            let left = &sheet.points[lattice::point_index(0, row, sheet.cols)];
            let right = &sheet.points[lattice::point_index(sheet.cols - 1, row, sheet.cols)];
            assert_eq!(left.x, 0.0);
            assert_eq!(right.x, w);
        }
        for col in 0..sheet.cols {
            assert_eq!(sheet.points[lattice::point_index(col, 0, sheet.cols)].y, 0.0);
            assert_eq!(sheet.points[lattice::point_index(col, sheet.rows - 1, sheet.cols)].y, h);
        }
    }

    #[test]
    fn test_seam_moves_only_nearby_points() {
        let mut sheet = TectonicSheet::new(20, 10, 2);
        let far = lattice::point_index(0, 0, sheet.cols);
        let near = lattice::point_index(5, 5, sheet.cols);
        let far_before = sheet.points[far].position();
        let near_before = sheet.points[near].position();
        let near_pos = near_before;
        sheet.seam(
            Vec2::new(near_pos.x + 0.5, 0.0),
            Vec2::new(near_pos.x + 0.5, 10.0),
            2.0,
            -0.5,
            1.0,
            0.3,
        );
        assert_eq!(sheet.points[far].position(), far_before);
        assert_ne!(sheet.points[near].position(), near_before);
        // Pulling toward the seam raises the crust.
        assert!(sheet.points[near].z > 0.0);
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let params = TectonicParams {
            seam_count: 2,
            settle_iterations: 2,
            untangle_iterations: 1,
            ..Default::default()
        };
        let mut a = TectonicSheet::new(16, 8, 77);
        let mut b = TectonicSheet::new(16, 8, 77);
        a.run_pipeline(&params);
        b.run_pipeline(&params);
        assert_eq!(a.points(), b.points());
        assert_eq!(a.sheet_height(4.2, 3.1), b.sheet_height(4.2, 3.1));
    }
}

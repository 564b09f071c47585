//! Index arithmetic for the tectonic sheet's alternating-row simplex lattice.
//!
//! Points sit in `rows` rows of `cols` points. Even rows start at x = 0, odd
//! rows are shifted right by half a cell (one unit), and neighboring points in a
//! row are two units apart. Between each pair of rows there are
//! `2 * (cols - 1)` triangles alternating between pointing away from and
//! toward the lower row.

/// Row-major index of the point at `(col, row)`.
pub fn point_index(col: usize, row: usize, cols: usize) -> usize {
    row * cols + col
}

/// Inverse of [`point_index`].
pub fn point_coords(index: usize, cols: usize) -> (usize, usize) {
    (index % cols, index / cols)
}

/// Horizontal shift of a row in lattice units.
pub fn row_offset(row: usize) -> usize {
    row % 2
}

/// Undeformed planar position of a lattice point.
pub fn rest_position(col: usize, row: usize) -> (f32, f32) {
    ((2 * col + row_offset(row)) as f32, row as f32)
}

/// Triangles between one pair of adjacent rows.
pub fn triangles_per_band(cols: usize) -> usize {
    2 * cols.saturating_sub(1)
}

pub fn triangle_count(cols: usize, rows: usize) -> usize {
    triangles_per_band(cols) * rows.saturating_sub(1)
}

/// The band (lower row) a triangle belongs to.
pub fn triangle_band(tri: usize, cols: usize) -> usize {
    tri / triangles_per_band(cols)
}

/// Point indices of a triangle's three corners.
///
/// Corners are listed as the two points sharing a row followed by the apex in
/// the other row.
pub fn triangle_corners(tri: usize, cols: usize) -> [usize; 3] {
    let per_band = triangles_per_band(cols);
    let row = tri / per_band;
    let k = tri % per_band;
    let col = k / 2;
    let first_kind = k % 2 == 0;
    let p = |c: usize, r: usize| point_index(c, r, cols);

    if row_offset(row) == 0 {
        // Lower row flush left, upper row shifted right.
        if first_kind {
            [p(col, row), p(col + 1, row), p(col, row + 1)]
        } else {
            [p(col, row + 1), p(col + 1, row + 1), p(col + 1, row)]
        }
    } else {
        // Lower row shifted right, upper row flush left.
        if first_kind {
            [p(col, row + 1), p(col + 1, row + 1), p(col, row)]
        } else {
            [p(col, row), p(col + 1, row), p(col + 1, row + 1)]
        }
    }
}

/// Indices of the (up to six) lattice neighbors of a point.
pub fn point_neighbors(col: usize, row: usize, cols: usize, rows: usize) -> Vec<usize> {
    let mut result = Vec::with_capacity(6);
    if col > 0 {
        result.push(point_index(col - 1, row, cols));
    }
    if col + 1 < cols {
        result.push(point_index(col + 1, row, cols));
    }

    // In the adjacent rows, a flush-left point touches columns (col - 1, col)
    // and a shifted point touches columns (col, col + 1).
    let (left, right) = if row_offset(row) == 0 {
        (col.checked_sub(1), Some(col))
    } else {
        (Some(col), Some(col + 1))
    };

    let mut adjacent_rows = Vec::with_capacity(2);
    if row > 0 {
        adjacent_rows.push(row - 1);
    }
    if row + 1 < rows {
        adjacent_rows.push(row + 1);
    }
    for r in adjacent_rows {
        for c in [left, right].into_iter().flatten() {
            if c < cols {
                result.push(point_index(c, r, cols));
            }
        }
    }
    result
}

/// A triangle whose rest footprint contains the given sheet-space point, used
/// as the starting guess for containment scans.
pub fn triangle_hint(x: f32, y: f32, cols: usize, rows: usize) -> usize {
    if cols < 2 || rows < 2 {
        return 0;
    }
    let band = (y.max(0.0) as usize).min(rows - 2);
    let col = ((x.max(0.0) / 2.0) as usize).min(cols - 2);
    band * triangles_per_band(cols) + 2 * col
}

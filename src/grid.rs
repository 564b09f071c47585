//! Dense row-major grid of world-map cells.
//!
//! Unlike a planetary tilemap this grid does not wrap: anything past an edge
//! simply does not exist, and neighbor queries only return in-bounds cells.

use serde::{Deserialize, Serialize};

/// A position on the world-map grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: usize,
    pub y: usize,
}

impl RegionPos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Search-order offsets for 4-connectivity: +x, -x, -y, +y.
pub const OFFSETS_4: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];

/// 8-connectivity offsets, row by row starting at the top-left.
pub const OFFSETS_8: [(i64, i64); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0),           (1, 0),
    (-1, 1),  (0, 1),  (1, 1),
];

/// Anything laid out as a fixed `width x height` grid.
pub trait GridBounds {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    /// The in-bounds neighbor of `pos` at the given offset.
    fn neighbor(&self, pos: RegionPos, dx: i64, dy: i64) -> Option<RegionPos> {
        let nx = pos.x as i64 + dx;
        let ny = pos.y as i64 + dy;
        if self.in_bounds(nx, ny) {
            Some(RegionPos::new(nx as usize, ny as usize))
        } else {
            None
        }
    }

    fn area(&self) -> usize {
        self.width() * self.height()
    }
}

/// A fixed-size 2D grid. Dimensions never change after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T> Grid<T> {
    /// Build a grid by calling `f(x, y)` for every cell in row-major order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn index_of(&self, pos: RegionPos) -> usize {
        pos.y * self.width + pos.x
    }

    pub fn pos_of(&self, index: usize) -> RegionPos {
        RegionPos::new(index % self.width, index / self.width)
    }

    pub fn get(&self, pos: RegionPos) -> &T {
        &self.data[self.index_of(pos)]
    }

    pub fn get_mut(&mut self, pos: RegionPos) -> &mut T {
        let idx = self.index_of(pos);
        &mut self.data[idx]
    }

    pub fn set(&mut self, pos: RegionPos, value: T) {
        let idx = self.index_of(pos);
        self.data[idx] = value;
    }

    /// Signed lookup; anything off the grid is `None`.
    pub fn get_checked(&self, x: i64, y: i64) -> Option<&T> {
        if self.in_bounds(x, y) {
            Some(&self.data[y as usize * self.width + x as usize])
        } else {
            None
        }
    }

    /// Iterate over all cells with their positions, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (RegionPos, &T)> {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(idx, val)| (RegionPos::new(idx % width, idx / width), val))
    }

    /// Iterate mutably over all cells with their positions, row-major.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RegionPos, &mut T)> {
        let width = self.width;
        self.data
            .iter_mut()
            .enumerate()
            .map(move |(idx, val)| (RegionPos::new(idx % width, idx / width), val))
    }

    pub fn positions(&self) -> impl Iterator<Item = RegionPos> {
        let width = self.width;
        (0..self.data.len()).map(move |idx| RegionPos::new(idx % width, idx / width))
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }
}

impl<T> GridBounds for Grid<T> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }
}

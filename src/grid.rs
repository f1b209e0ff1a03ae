//! Toroidal grid geometry.
//!
//! Both the pheromone field and agent positions live on the same `W × H`
//! periodic plane. Cells are stored row-major (`x + y * W`), and every lookup
//! (agent motion, sensor sampling, diffusion neighbourhoods) wraps at the
//! edges instead of clamping.

/// Dimensions of the simulation plane, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of cells (`W * H`).
    #[inline]
    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of an in-range cell.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        x as usize + y as usize * self.width as usize
    }

    /// Index of the cell at integer offset `(dx, dy)` from `(x, y)`, wrapping on both axes.
    #[inline]
    pub fn wrapped_index(&self, x: i64, y: i64) -> usize {
        let wx = x.rem_euclid(self.width as i64) as usize;
        let wy = y.rem_euclid(self.height as i64) as usize;
        wx + wy * self.width as usize
    }

    /// Cell containing a continuous position. The position is wrapped first,
    /// so any finite input maps to a valid cell.
    #[inline]
    pub fn cell_of(&self, x: f32, y: f32) -> usize {
        let cx = (wrap(x, self.width as f32).floor() as u32).min(self.width - 1);
        let cy = (wrap(y, self.height as f32).floor() as u32).min(self.height - 1);
        self.index(cx, cy)
    }

    /// Centre of the plane in continuous coordinates.
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

/// Wrap a coordinate into `[0, extent)`.
///
/// `rem_euclid` can round up to exactly `extent` for tiny negative inputs, so
/// that case is folded back to zero to keep the half-open range.
#[inline]
pub fn wrap(v: f32, extent: f32) -> f32 {
    let r = v.rem_euclid(extent);
    if r >= extent {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_row_major() {
        let grid = GridSize::new(10, 4);
        assert_eq!(grid.cells(), 40);
        assert_eq!(grid.index(0, 0), 0);
        assert_eq!(grid.index(9, 0), 9);
        assert_eq!(grid.index(0, 1), 10);
        assert_eq!(grid.index(3, 2), 23);
    }

    #[test]
    fn test_wrapped_index_negative_and_overflow() {
        let grid = GridSize::new(8, 6);
        assert_eq!(grid.wrapped_index(-1, 0), grid.index(7, 0));
        assert_eq!(grid.wrapped_index(8, 0), grid.index(0, 0));
        assert_eq!(grid.wrapped_index(0, -1), grid.index(0, 5));
        assert_eq!(grid.wrapped_index(-9, 13), grid.index(7, 1));
    }

    #[test]
    fn test_wrap_modular_not_clamped() {
        assert_eq!(wrap(1083.0, 1080.0), 3.0);
        assert_eq!(wrap(-2.0, 100.0), 98.0);
        assert_eq!(wrap(0.0, 100.0), 0.0);
        assert_eq!(wrap(250.0, 100.0), 50.0);
    }

    #[test]
    fn test_wrap_stays_half_open() {
        let v = wrap(-1e-9, 1080.0);
        assert!((0.0..1080.0).contains(&v));
    }

    #[test]
    fn test_cell_of_wraps_position() {
        let grid = GridSize::new(16, 16);
        assert_eq!(grid.cell_of(-0.5, 0.2), grid.index(15, 0));
        assert_eq!(grid.cell_of(16.2, 17.9), grid.index(0, 1));
        assert_eq!(grid.cell_of(3.99, 2.01), grid.index(3, 2));
    }
}

// src/grid.rs

/// Cubic n × n × n grid; one matrix row per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid3D {
    pub n: usize,
}

impl Grid3D {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Total number of cells (= matrix rows).
    pub fn n_cells(&self) -> usize {
        self.n * self.n * self.n
    }

    /// Convert (ix, iy, iz) to a flat row index. x varies fastest.
    #[inline]
    pub fn idx(&self, ix: usize, iy: usize, iz: usize) -> usize {
        debug_assert!(ix < self.n && iy < self.n && iz < self.n);
        (iz * self.n + iy) * self.n + ix
    }

    /// Inverse of [`Grid3D::idx`].
    #[inline]
    pub fn coords(&self, row: usize) -> (usize, usize, usize) {
        let n = self.n;
        (row % n, (row / n) % n, row / (n * n))
    }

    /// Grid size of the next coarser level, if the size halves to an integer.
    pub fn coarsened(&self) -> Option<Self> {
        if self.n >= 2 && self.n % 2 == 0 {
            Some(Self::new(self.n / 2))
        } else {
            None
        }
    }

    /// Number of in-bounds points of the 27-point stencil around `row`, self included.
    pub fn stencil_points(&self, row: usize) -> usize {
        let (ix, iy, iz) = self.coords(row);
        let span = |i: usize| 1 + usize::from(i > 0) + usize::from(i + 1 < self.n);
        span(ix) * span(iy) * span(iz)
    }
}

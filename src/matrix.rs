// src/matrix.rs
//
// Blocked sparse matrix for the 27-point stencil on an n × n × n grid.
//
// Layout (per row, fixed stride of 32 slots in `cols` / `vals`):
//
//   slots [0, 16)  : entries with col <= row, appended in stencil order (diagonal included)
//   slots [16, 32) : entries with col >  row, appended in stencil order
//   unused slots   : col = 0, val = 0.0
//
// A full row has 14 lower entries (13 neighbours + diagonal) and 13 upper entries, so
// neither half can overflow. Summing all 32 slots of a row gives the same result as the
// packed sum over its stored entries, which is what the SpMV kernels rely on.

use tracing::debug;

use crate::buffer::AlignedBuf;
use crate::error::{BenchError, Result};
use crate::grid::Grid3D;

/// Slots per row.
pub const ROW_STRIDE: usize = 32;
/// First slot of the upper half.
pub const UPPER_OFFSET: usize = ROW_STRIDE / 2;
/// Slots per half.
pub const HALF_STRIDE: usize = ROW_STRIDE / 2;

pub const DIAG_VALUE: f64 = 26.0;
pub const OFF_DIAG_VALUE: f64 = -1.0;

pub struct StencilMatrix {
    pub grid: Grid3D,
    pub nrow: usize,
    /// Stored entries over all rows (diagonals included).
    pub total_nnz: usize,
    /// Stored entries per row, diagonal included (at most 27).
    pub nnzs: AlignedBuf<u8>,
    pub cols: AlignedBuf<u32>,
    pub vals: AlignedBuf<f64>,
    pub diag: AlignedBuf<f64>,
    /// Carry state for the optimized kernels (SpTRSV / SYMGS `p`).
    pub tmp: AlignedBuf<f64>,
    /// Carry state for the reference kernels.
    pub tmpr: AlignedBuf<f64>,
}

impl StencilMatrix {
    /// Generate the matrix for an n³ grid. Identical `n` always yields an identical matrix.
    pub fn build(n: usize) -> Result<Self> {
        let nrow = n
            .checked_mul(n)
            .and_then(|v| v.checked_mul(n))
            .filter(|&rows| rows > 0 && rows <= u32::MAX as usize)
            .ok_or_else(|| {
                BenchError::Configuration(format!("grid size {n} gives an unaddressable row count"))
            })?;
        let grid = Grid3D::new(n);

        let mut nnzs: AlignedBuf<u8> = AlignedBuf::zeroed(nrow, "nnzs")?;
        let mut cols: AlignedBuf<u32> = AlignedBuf::zeroed(nrow * ROW_STRIDE, "cols")?;
        let mut vals: AlignedBuf<f64> = AlignedBuf::zeroed(nrow * ROW_STRIDE, "vals")?;
        let mut diag: AlignedBuf<f64> = AlignedBuf::zeroed(nrow, "diag")?;
        let tmp = AlignedBuf::zeroed(nrow, "tmp")?;
        let tmpr = AlignedBuf::zeroed(nrow, "tmpr")?;

        let ni = n as isize;
        let mut total_nnz = 0usize;

        for row in 0..nrow {
            let (ix, iy, iz) = grid.coords(row);
            let base = row * ROW_STRIDE;
            let mut lower = 0usize;
            let mut upper = 0usize;

            for t in 0..27isize {
                let sz = t / 9 - 1;
                let sy = (t / 3) % 3 - 1;
                let sx = t % 3 - 1;

                let jx = ix as isize + sx;
                let jy = iy as isize + sy;
                let jz = iz as isize + sz;
                if !(0..ni).contains(&jx) || !(0..ni).contains(&jy) || !(0..ni).contains(&jz) {
                    continue;
                }

                let col = grid.idx(jx as usize, jy as usize, jz as usize);
                if col <= row {
                    let slot = base + lower;
                    cols[slot] = col as u32;
                    vals[slot] = if col == row { DIAG_VALUE } else { OFF_DIAG_VALUE };
                    lower += 1;
                } else {
                    let slot = base + UPPER_OFFSET + upper;
                    cols[slot] = col as u32;
                    vals[slot] = OFF_DIAG_VALUE;
                    upper += 1;
                }
            }

            debug_assert!(lower <= HALF_STRIDE && upper <= HALF_STRIDE);
            diag[row] = DIAG_VALUE;
            nnzs[row] = (lower + upper) as u8;
            total_nnz += lower + upper;
        }

        debug!(n, nrow, total_nnz, "built stencil matrix");

        Ok(Self {
            grid,
            nrow,
            total_nnz,
            nnzs,
            cols,
            vals,
            diag,
            tmp,
            tmpr,
        })
    }

    /// Grid size n.
    pub fn n(&self) -> usize {
        self.grid.n
    }

    #[inline]
    fn span(row: usize, start: usize, len: usize) -> std::ops::Range<usize> {
        let base = row * ROW_STRIDE + start;
        base..base + len
    }

    /// All 32 column slots of `row`.
    pub fn row_cols(&self, row: usize) -> &[u32] {
        &self.cols[Self::span(row, 0, ROW_STRIDE)]
    }

    /// All 32 value slots of `row`.
    pub fn row_vals(&self, row: usize) -> &[f64] {
        &self.vals[Self::span(row, 0, ROW_STRIDE)]
    }

    /// Lower half (col <= row) of `row`: (cols, vals).
    pub fn lower(&self, row: usize) -> (&[u32], &[f64]) {
        let r = Self::span(row, 0, HALF_STRIDE);
        (&self.cols[r.clone()], &self.vals[r])
    }

    /// Upper half (col > row) of `row`: (cols, vals).
    pub fn upper(&self, row: usize) -> (&[u32], &[f64]) {
        let r = Self::span(row, UPPER_OFFSET, HALF_STRIDE);
        (&self.cols[r.clone()], &self.vals[r])
    }

    /// Zero both kernel carry arrays.
    pub fn reset_carry(&mut self) {
        self.tmp.fill(0.0);
        self.tmpr.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_and_diagonal() {
        let a = StencilMatrix::build(8).unwrap();
        assert_eq!(a.nrow, 512);
        assert_eq!(a.cols.len(), 512 * ROW_STRIDE);
        assert!(a.diag.iter().all(|&d| d == DIAG_VALUE));
        assert_eq!(
            a.total_nnz,
            a.nnzs.iter().map(|&k| usize::from(k)).sum::<usize>()
        );
    }

    #[test]
    fn halves_respect_row_ordering() {
        let a = StencilMatrix::build(4).unwrap();
        for row in 0..a.nrow {
            let (lc, lv) = a.lower(row);
            let (uc, uv) = a.upper(row);
            let nl = lv.iter().filter(|&&v| v != 0.0).count();
            let nu = uv.iter().filter(|&&v| v != 0.0).count();
            assert_eq!(nl + nu, usize::from(a.nnzs[row]));

            // stored entries first, zero padding after
            assert!(lv[..nl].iter().all(|&v| v != 0.0));
            assert!(lv[nl..].iter().all(|&v| v == 0.0));
            assert!(lc[nl..].iter().all(|&c| c == 0));
            assert!(uv[nu..].iter().all(|&v| v == 0.0));
            assert!(uc[nu..].iter().all(|&c| c == 0));

            assert!(lc[..nl].iter().all(|&c| c as usize <= row));
            assert!(uc[..nu].iter().all(|&c| c as usize > row));

            // exactly one diagonal entry, in the lower half
            let diag_slots: Vec<usize> = (0..nl).filter(|&k| lc[k] as usize == row).collect();
            assert_eq!(diag_slots.len(), 1);
            assert_eq!(lv[diag_slots[0]], DIAG_VALUE);
        }
    }

    #[test]
    fn interior_row_has_full_stencil() {
        let a = StencilMatrix::build(8).unwrap();
        let row = a.grid.idx(4, 4, 4);
        assert_eq!(a.nnzs[row], 27);
        let (_, lv) = a.lower(row);
        let (_, uv) = a.upper(row);
        assert_eq!(lv.iter().filter(|&&v| v != 0.0).count(), 14);
        assert_eq!(uv.iter().filter(|&&v| v != 0.0).count(), 13);
        assert_eq!(a.row_vals(row).iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn build_is_deterministic() {
        let a = StencilMatrix::build(8).unwrap();
        let b = StencilMatrix::build(8).unwrap();
        assert_eq!(a.cols.as_slice(), b.cols.as_slice());
        assert_eq!(a.vals.as_slice(), b.vals.as_slice());
        assert_eq!(a.nnzs.as_slice(), b.nnzs.as_slice());
    }

    #[test]
    fn empty_or_unaddressable_grid_is_rejected() {
        assert!(StencilMatrix::build(0).is_err());
        assert!(StencilMatrix::build(1 << 11).is_err());
    }
}

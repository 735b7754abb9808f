// src/reference.rs
//
// Scalar reference kernels. These define the numerics every optimized backend must
// reproduce (to within the validation tolerance).
//
// All three work directly on the stride-32 slot layout of `StencilMatrix`:
//
//   SpMV   : y[i] = Σ_{k<32} val[i,k] · x[col[i,k]]           (unused slots are 0)
//   SpTRSV : forward substitution over the lower half, in place on x, with carry p
//   SYMGS  : one symmetric Gauss–Seidel sweep in three ordered phases
//
// SYMGS phases (order matters):
//   1. p[i] = -Σ upper(i) · x                                  (pre-sweep x)
//   2. i ascending:  s = r[i] - Σ lower(i) · x
//                    x[i] += (s + p[i]) / d[i]
//                    p[i]  = s + d[i] · x_old[i]
//   3. i descending: x[i] = (p[i] - Σ upper(i) · x) / d[i]
//
// The lower half stores the diagonal, so `s` already contains -d[i]·x_old[i]. Phase 2 is
// the usual forward sweep written as a correction. Adding d[i]·x_old[i] back into the
// carry leaves p[i] = r[i] - Σ_{j<i} a_ij x_j, which makes phase 3 a plain (D+U) solve.

use crate::error::{BenchError, Result};
use crate::kernels::KernelKind;
use crate::matrix::{HALF_STRIDE, ROW_STRIDE, StencilMatrix, UPPER_OFFSET};
use crate::vector::Vector;

#[inline]
fn half_dot(cols: &[u32], vals: &[f64], base: usize, x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for j in 0..HALF_STRIDE {
        sum += vals[base + j] * x[cols[base + j] as usize];
    }
    sum
}

pub fn spmv_slots(nrow: usize, cols: &[u32], vals: &[f64], x: &[f64], y: &mut [f64]) {
    for (i, yi) in y.iter_mut().enumerate().take(nrow) {
        let base = i * ROW_STRIDE;
        let mut sum = 0.0;
        for j in 0..ROW_STRIDE {
            sum += vals[base + j] * x[cols[base + j] as usize];
        }
        *yi = sum;
    }
}

pub fn sptrsv_slots(
    nrow: usize,
    cols: &[u32],
    vals: &[f64],
    x: &mut [f64],
    p: &mut [f64],
    diag: &[f64],
    r: &[f64],
) {
    for i in 0..nrow {
        let sum = r[i] - half_dot(cols, vals, i * ROW_STRIDE, x);
        x[i] += (sum + p[i]) / diag[i];
        p[i] = sum;
    }
}

/// `ucols`/`uvals` are the slot arrays offset by `UPPER_OFFSET`; `lcols`/`lvals` start at 0.
#[allow(clippy::too_many_arguments)]
pub fn symgs_slots(
    nrow: usize,
    ucols: &[u32],
    lcols: &[u32],
    uvals: &[f64],
    lvals: &[f64],
    x: &mut [f64],
    p: &mut [f64],
    diag: &[f64],
    r: &[f64],
) {
    for i in 0..nrow {
        p[i] = -half_dot(ucols, uvals, i * ROW_STRIDE, x);
    }

    for i in 0..nrow {
        let sum = r[i] - half_dot(lcols, lvals, i * ROW_STRIDE, x);
        let x_old = x[i];
        x[i] += (sum + p[i]) / diag[i];
        p[i] = sum + diag[i] * x_old;
    }

    for i in (0..nrow).rev() {
        let sum = p[i] - half_dot(ucols, uvals, i * ROW_STRIDE, x);
        x[i] = sum / diag[i];
    }
}

fn check_len(a: &StencilMatrix, v: &Vector) -> Result<()> {
    if v.len() != a.nrow {
        return Err(BenchError::LengthMismatch {
            left: a.nrow,
            right: v.len(),
        });
    }
    Ok(())
}

/// y = A·x
pub fn spmv(a: &StencilMatrix, x: &Vector, y: &mut Vector) -> Result<()> {
    check_len(a, x)?;
    check_len(a, y)?;
    spmv_slots(a.nrow, &a.cols, &a.vals, x.as_slice(), y.as_mut_slice());
    Ok(())
}

/// Forward solve on x in place, carrying state in `a.tmpr`.
pub fn sptrsv(a: &mut StencilMatrix, r: &Vector, x: &mut Vector) -> Result<()> {
    check_len(a, r)?;
    check_len(a, x)?;
    sptrsv_slots(
        a.nrow,
        &a.cols,
        &a.vals,
        x.as_mut_slice(),
        &mut a.tmpr,
        &a.diag,
        r.as_slice(),
    );
    Ok(())
}

/// One symmetric Gauss–Seidel sweep on x, carrying state in `a.tmpr`.
pub fn symgs(a: &mut StencilMatrix, r: &Vector, x: &mut Vector) -> Result<()> {
    check_len(a, r)?;
    check_len(a, x)?;
    symgs_slots(
        a.nrow,
        &a.cols[UPPER_OFFSET..],
        &a.cols,
        &a.vals[UPPER_OFFSET..],
        &a.vals,
        x.as_mut_slice(),
        &mut a.tmpr,
        &a.diag,
        r.as_slice(),
    );
    Ok(())
}

/// Run the reference kernel of the given kind: for SpMV `x = A·r`, otherwise update x in place.
pub fn run(kind: KernelKind, a: &mut StencilMatrix, r: &Vector, x: &mut Vector) -> Result<()> {
    match kind {
        KernelKind::Spmv => spmv(a, r, x),
        KernelKind::Sptrsv => sptrsv(a, r, x),
        KernelKind::Symgs => symgs(a, r, x),
    }
}

/// ‖A·x - b‖²
pub fn residual_norm_sq(a: &StencilMatrix, x: &Vector, b: &Vector) -> Result<f64> {
    let mut ax = Vector::new(a.nrow)?;
    spmv(a, x, &mut ax)?;
    ax.squared_norm_difference(b)
}

// src/kernels/portable.rs
//
// Portable blocked kernels.
//
// Each row's slots are consumed in fixed-width blocks of LANES values: gather x at the
// block's columns, multiply by the block's values and accumulate lane-wise, then reduce
// the lanes with a pairwise horizontal sum. The lane accumulator lives in the
// dispatcher's scratch buffer. Lane width / unrolling beyond that is left to the
// compiler's vectoriser.

use super::{KernelStatus, LANES, SparseKernels, require, require_scratch, slot_len};
use crate::error::KernelFault;
use crate::matrix::{HALF_STRIDE, ROW_STRIDE, UPPER_OFFSET};

pub struct PortableKernels;

/// Gather–multiply–accumulate `len` slots starting at `base` into the lanes of `acc`.
#[inline(always)]
pub(crate) fn gather_accumulate(
    cols: &[u32],
    vals: &[f64],
    base: usize,
    len: usize,
    x: &[f64],
    acc: &mut [f64; LANES],
) {
    let cols = &cols[base..base + len];
    let vals = &vals[base..base + len];
    for (c, v) in cols.chunks_exact(LANES).zip(vals.chunks_exact(LANES)) {
        for l in 0..LANES {
            acc[l] += v[l] * x[c[l] as usize];
        }
    }
}

/// Pairwise lane reduction (8 -> 4 -> 2 -> 1).
#[inline(always)]
pub(crate) fn horizontal_sum(acc: &[f64; LANES]) -> f64 {
    let q = [
        acc[0] + acc[4],
        acc[1] + acc[5],
        acc[2] + acc[6],
        acc[3] + acc[7],
    ];
    let h = [q[0] + q[2], q[1] + q[3]];
    h[0] + h[1]
}

/// Dot product of `len` slots with x, reduced to a scalar.
#[inline(always)]
pub(crate) fn slot_dot(
    cols: &[u32],
    vals: &[f64],
    base: usize,
    len: usize,
    x: &[f64],
    acc: &mut [f64; LANES],
) -> f64 {
    acc.fill(0.0);
    gather_accumulate(cols, vals, base, len, x, acc);
    horizontal_sum(acc)
}

fn lanes(scratch: &mut [f64]) -> Result<&mut [f64; LANES], KernelFault> {
    require_scratch(scratch, LANES)?;
    let actual = scratch.len();
    <&mut [f64; LANES]>::try_from(&mut scratch[..LANES]).map_err(|_| {
        KernelFault::ScratchTooSmall {
            required: LANES,
            actual,
        }
    })
}

pub(crate) fn check_vectors(nrow: usize, vecs: &[(&'static str, usize)]) -> KernelStatus {
    for &(what, len) in vecs {
        require(what, len, nrow)?;
    }
    Ok(())
}

/// Forward sweep shared by SpTRSV and SYMGS phase 2. `keep_diag` selects the carry:
/// SpTRSV stores the plain row sum, SYMGS adds back d[i]·x_old[i].
#[inline]
#[allow(clippy::too_many_arguments)]
pub(crate) fn forward_sweep(
    nrow: usize,
    lcols: &[u32],
    lvals: &[f64],
    x: &mut [f64],
    acc: &mut [f64; LANES],
    p: &mut [f64],
    diag: &[f64],
    r: &[f64],
    keep_diag: bool,
) {
    for i in 0..nrow {
        let sum = r[i] - slot_dot(lcols, lvals, i * ROW_STRIDE, HALF_STRIDE, x, acc);
        let x_old = x[i];
        x[i] += (sum + p[i]) / diag[i];
        p[i] = if keep_diag { sum + diag[i] * x_old } else { sum };
    }
}

/// SYMGS phase 3: backward (D+U) solve from the forward carry.
#[inline]
pub(crate) fn backward_sweep(
    nrow: usize,
    ucols: &[u32],
    uvals: &[f64],
    x: &mut [f64],
    acc: &mut [f64; LANES],
    p: &[f64],
    diag: &[f64],
) {
    for i in (0..nrow).rev() {
        let sum = p[i] - slot_dot(ucols, uvals, i * ROW_STRIDE, HALF_STRIDE, x, acc);
        x[i] = sum / diag[i];
    }
}

impl SparseKernels for PortableKernels {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn spmv(
        &self,
        nrow: usize,
        cols: &[u32],
        vals: &[f64],
        x: &[f64],
        scratch: &mut [f64],
        y: &mut [f64],
    ) -> KernelStatus {
        require("cols", cols.len(), slot_len(nrow, 0))?;
        require("vals", vals.len(), slot_len(nrow, 0))?;
        require("x", x.len(), nrow)?;
        require("y", y.len(), nrow)?;
        let acc = lanes(scratch)?;

        for (i, yi) in y.iter_mut().enumerate().take(nrow) {
            *yi = slot_dot(cols, vals, i * ROW_STRIDE, ROW_STRIDE, x, acc);
        }
        Ok(())
    }

    fn sptrsv(
        &self,
        nrow: usize,
        cols: &[u32],
        vals: &[f64],
        x: &mut [f64],
        scratch: &mut [f64],
        p: &mut [f64],
        diag: &[f64],
        r: &[f64],
    ) -> KernelStatus {
        require("cols", cols.len(), slot_len(nrow, 0))?;
        require("vals", vals.len(), slot_len(nrow, 0))?;
        check_vectors(
            nrow,
            &[("x", x.len()), ("p", p.len()), ("diag", diag.len()), ("r", r.len())],
        )?;
        let acc = lanes(scratch)?;

        forward_sweep(nrow, cols, vals, x, acc, p, diag, r, false);
        Ok(())
    }

    fn symgs(
        &self,
        nrow: usize,
        ucols: &[u32],
        lcols: &[u32],
        uvals: &[f64],
        lvals: &[f64],
        x: &mut [f64],
        scratch: &mut [f64],
        p: &mut [f64],
        diag: &[f64],
        r: &[f64],
    ) -> KernelStatus {
        require("ucols", ucols.len(), slot_len(nrow, UPPER_OFFSET))?;
        require("uvals", uvals.len(), slot_len(nrow, UPPER_OFFSET))?;
        require("lcols", lcols.len(), slot_len(nrow, 0))?;
        require("lvals", lvals.len(), slot_len(nrow, 0))?;
        check_vectors(
            nrow,
            &[("x", x.len()), ("p", p.len()), ("diag", diag.len()), ("r", r.len())],
        )?;
        let acc = lanes(scratch)?;

        for i in 0..nrow {
            p[i] = -slot_dot(ucols, uvals, i * ROW_STRIDE, HALF_STRIDE, x, acc);
        }
        forward_sweep(nrow, lcols, lvals, x, acc, p, diag, r, true);
        backward_sweep(nrow, ucols, uvals, x, acc, p, diag);
        Ok(())
    }
}

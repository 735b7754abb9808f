// src/kernels/parallel.rs
//
// Rayon backend.
//
// SpMV rows are independent, so they are split into row blocks and processed in parallel
// with one lane accumulator per task. SpTRSV and the SYMGS forward/backward sweeps carry a
// row-to-row dependency and stay sequential; only the SYMGS upper precompute (which reads
// the pre-sweep x) runs in parallel. Each call still blocks until all work is done.

use rayon::prelude::*;

use super::portable::{backward_sweep, check_vectors, forward_sweep, slot_dot};
use super::{KernelStatus, LANES, SparseKernels, require, require_scratch, slot_len};
use crate::matrix::{HALF_STRIDE, ROW_STRIDE, UPPER_OFFSET};

/// Rows per rayon task.
const ROW_BLOCK: usize = 256;

pub struct RayonKernels;

impl SparseKernels for RayonKernels {
    fn name(&self) -> &'static str {
        "rayon"
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
        require_scratch(scratch, LANES)?;

        y[..nrow]
            .par_chunks_mut(ROW_BLOCK)
            .enumerate()
            .for_each(|(block, y_block)| {
                let mut acc = [0.0; LANES];
                let row0 = block * ROW_BLOCK;
                for (k, yi) in y_block.iter_mut().enumerate() {
                    let base = (row0 + k) * ROW_STRIDE;
                    *yi = slot_dot(cols, vals, base, ROW_STRIDE, x, &mut acc);
                }
            });
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
        require_scratch(scratch, LANES)?;

        let mut acc = [0.0; LANES];
        forward_sweep(nrow, cols, vals, x, &mut acc, p, diag, r, false);
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
        require_scratch(scratch, LANES)?;

        {
            let x_ro: &[f64] = x;
            p[..nrow]
                .par_chunks_mut(ROW_BLOCK)
                .enumerate()
                .for_each(|(block, p_block)| {
                    let mut acc = [0.0; LANES];
                    let row0 = block * ROW_BLOCK;
                    for (k, pi) in p_block.iter_mut().enumerate() {
                        let base = (row0 + k) * ROW_STRIDE;
                        *pi = -slot_dot(ucols, uvals, base, HALF_STRIDE, x_ro, &mut acc);
                    }
                });
        }

        let mut acc = [0.0; LANES];
        forward_sweep(nrow, lcols, lvals, x, &mut acc, p, diag, r, true);
        backward_sweep(nrow, ucols, uvals, x, &mut acc, p, diag);
        Ok(())
    }
}

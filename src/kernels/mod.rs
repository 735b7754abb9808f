// src/kernels/mod.rs
//
// Pluggable optimized kernels.
//
// A backend implements `SparseKernels`, the typed form of the three kernel entry points.
// Backends are registered statically in `REGISTRY` and selected by name, so there is no
// symbol resolution at run time: an unknown name is reported as a linkage error before any
// problem data is built.
//
// The dispatcher owns a small scratch buffer (zeroed once, reused on every call). Calls
// take `&mut self`, so one dispatcher can never have two kernel calls in flight.

pub mod parallel;
pub mod portable;

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::buffer::AlignedBuf;
use crate::error::{BenchError, KernelFault, Phase, Result};
use crate::matrix::{ROW_STRIDE, StencilMatrix, UPPER_OFFSET};
use crate::reference;
use crate::vector::Vector;

/// Values per block in the portable kernels.
pub const LANES: usize = 8;

/// Scratch doubles handed to every kernel call.
pub const SCRATCH_LEN: usize = 64;

/// Backend used when none is configured.
pub const DEFAULT_BACKEND: &str = "portable";

pub type KernelStatus = std::result::Result<(), KernelFault>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Spmv,
    Sptrsv,
    Symgs,
}

impl KernelKind {
    pub const ALL: [KernelKind; 3] = [Self::Spmv, Self::Sptrsv, Self::Symgs];

    /// Kernel selected by `kernel_type / 2` on the command line.
    pub fn from_index(i: u32) -> Option<Self> {
        match i {
            0 => Some(Self::Spmv),
            1 => Some(Self::Sptrsv),
            2 => Some(Self::Symgs),
            _ => None,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            Self::Spmv => 0,
            Self::Sptrsv => 1,
            Self::Symgs => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spmv => "spmv",
            Self::Sptrsv => "sptrsv",
            Self::Symgs => "symgs",
        }
    }

    /// Nominal floating-point operations per matrix row.
    pub fn flops_per_row(&self) -> u64 {
        match self {
            Self::Spmv => 27 * 2,
            Self::Sptrsv => 14 * 2,
            Self::Symgs => (26 * 2 + 1) * 2,
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Kernel entry points. Column/value arrays use the stride-32 slot layout; for SYMGS the
/// upper arrays are the same storage offset by 16 slots.
pub trait SparseKernels: Sync {
    fn name(&self) -> &'static str;

    /// Load-time probe, run once before any problem data is built.
    fn init(&self, _kind: KernelKind) -> KernelStatus {
        Ok(())
    }

    fn spmv(
        &self,
        nrow: usize,
        cols: &[u32],
        vals: &[f64],
        x: &[f64],
        scratch: &mut [f64],
        y: &mut [f64],
    ) -> KernelStatus;

    #[allow(clippy::too_many_arguments)]
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
    ) -> KernelStatus;

    #[allow(clippy::too_many_arguments)]
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
    ) -> KernelStatus;
}

// ---------------------------
// Shape checks shared by the backends
// ---------------------------

pub(crate) fn require(what: &'static str, actual: usize, expected: usize) -> KernelStatus {
    if actual < expected {
        return Err(KernelFault::ShapeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn require_scratch(scratch: &[f64], required: usize) -> KernelStatus {
    if scratch.len() < required {
        return Err(KernelFault::ScratchTooSmall {
            required,
            actual: scratch.len(),
        });
    }
    Ok(())
}

/// Slots needed in an array that starts `offset` slots into the row layout.
pub(crate) fn slot_len(nrow: usize, offset: usize) -> usize {
    if nrow == 0 {
        0
    } else {
        nrow * ROW_STRIDE - offset
    }
}

// ---------------------------
// Reference backend (scalar oracle behind the same contract)
// ---------------------------

pub struct ReferenceKernels;

impl SparseKernels for ReferenceKernels {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn spmv(
        &self,
        nrow: usize,
        cols: &[u32],
        vals: &[f64],
        x: &[f64],
        _scratch: &mut [f64],
        y: &mut [f64],
    ) -> KernelStatus {
        require("cols", cols.len(), slot_len(nrow, 0))?;
        require("vals", vals.len(), slot_len(nrow, 0))?;
        require("x", x.len(), nrow)?;
        require("y", y.len(), nrow)?;
        reference::spmv_slots(nrow, cols, vals, x, y);
        Ok(())
    }

    fn sptrsv(
        &self,
        nrow: usize,
        cols: &[u32],
        vals: &[f64],
        x: &mut [f64],
        _scratch: &mut [f64],
        p: &mut [f64],
        diag: &[f64],
        r: &[f64],
    ) -> KernelStatus {
        require("cols", cols.len(), slot_len(nrow, 0))?;
        require("vals", vals.len(), slot_len(nrow, 0))?;
        for (what, len) in [("x", x.len()), ("p", p.len()), ("diag", diag.len()), ("r", r.len())] {
            require(what, len, nrow)?;
        }
        reference::sptrsv_slots(nrow, cols, vals, x, p, diag, r);
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
        _scratch: &mut [f64],
        p: &mut [f64],
        diag: &[f64],
        r: &[f64],
    ) -> KernelStatus {
        require("ucols", ucols.len(), slot_len(nrow, UPPER_OFFSET))?;
        require("uvals", uvals.len(), slot_len(nrow, UPPER_OFFSET))?;
        require("lcols", lcols.len(), slot_len(nrow, 0))?;
        require("lvals", lvals.len(), slot_len(nrow, 0))?;
        for (what, len) in [("x", x.len()), ("p", p.len()), ("diag", diag.len()), ("r", r.len())] {
            require(what, len, nrow)?;
        }
        reference::symgs_slots(nrow, ucols, lcols, uvals, lvals, x, p, diag, r);
        Ok(())
    }
}

// ---------------------------
// Registry
// ---------------------------

static REGISTRY: [&dyn SparseKernels; 3] = [
    &portable::PortableKernels,
    &parallel::RayonKernels,
    &ReferenceKernels,
];

/// Names of all registered backends.
pub fn backend_names() -> Vec<&'static str> {
    REGISTRY.iter().map(|b| b.name()).collect()
}

/// Look up a backend by name (case-insensitive).
pub fn lookup(name: &str) -> Result<&'static dyn SparseKernels> {
    let wanted = name.trim().to_ascii_lowercase();
    REGISTRY
        .iter()
        .copied()
        .find(|b| b.name() == wanted)
        .ok_or_else(|| BenchError::Linkage {
            backend: name.to_string(),
            reason: format!("not registered (available: {})", backend_names().join(", ")),
        })
}

// ---------------------------
// Dispatcher
// ---------------------------

pub struct KernelDispatcher {
    kind: KernelKind,
    backend: &'static dyn SparseKernels,
    scratch: AlignedBuf<f64>,
}

impl KernelDispatcher {
    /// Bind `kind` on the named backend and run its init probe.
    pub fn new(kind: KernelKind, backend: &str) -> Result<Self> {
        Self::with_backend(kind, lookup(backend)?)
    }

    pub fn with_backend(kind: KernelKind, backend: &'static dyn SparseKernels) -> Result<Self> {
        backend
            .init(kind)
            .map_err(|fault| BenchError::Linkage {
                backend: backend.name().to_string(),
                reason: fault.to_string(),
            })?;
        let scratch = AlignedBuf::zeroed(SCRATCH_LEN, "kernel scratch")?;
        debug!(backend = backend.name(), %kind, "kernel bound");
        Ok(Self {
            kind,
            backend,
            scratch,
        })
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Invoke the bound kernel: for SpMV `x = A·r`, otherwise update x in place using
    /// `a.tmp` as carry state.
    pub fn run(&mut self, a: &mut StencilMatrix, r: &Vector, x: &mut Vector) -> KernelStatus {
        require("r", r.len(), a.nrow)?;
        require("x", x.len(), a.nrow)?;

        let nrow = a.nrow;
        let scratch = self.scratch.as_mut_slice();
        match self.kind {
            KernelKind::Spmv => {
                self.backend
                    .spmv(nrow, &a.cols, &a.vals, r.as_slice(), scratch, x.as_mut_slice())
            }
            KernelKind::Sptrsv => self.backend.sptrsv(
                nrow,
                &a.cols,
                &a.vals,
                x.as_mut_slice(),
                scratch,
                &mut a.tmp,
                &a.diag,
                r.as_slice(),
            ),
            KernelKind::Symgs => self.backend.symgs(
                nrow,
                &a.cols[UPPER_OFFSET..],
                &a.cols,
                &a.vals[UPPER_OFFSET..],
                &a.vals,
                x.as_mut_slice(),
                scratch,
                &mut a.tmp,
                &a.diag,
                r.as_slice(),
            ),
        }
    }

    /// Like [`KernelDispatcher::run`], with faults wrapped for the given phase.
    pub fn run_in(
        &mut self,
        phase: Phase,
        a: &mut StencilMatrix,
        r: &Vector,
        x: &mut Vector,
    ) -> Result<()> {
        let kind = self.kind;
        self.run(a, r, x)
            .map_err(|fault| BenchError::Kernel { phase, kind, fault })
    }
}

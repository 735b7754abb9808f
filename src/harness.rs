// src/harness.rs
//
// Validation and benchmark driver.
//
// Order of a run:
//   1. bind the kernel (linkage errors surface here, before any allocation of problem data)
//   2. build the problem: 4-level hierarchy, b = A·1 (from the row degrees), x = x_ref = 1
//   3. validate (optional): reseed x = x_ref and clear both carries, then optimized kernel
//      into x (carry `tmp`), reference into x_ref (carry `tmpr`); fail if the squared norm
//      difference is NaN or above 1e-5. SYMGS starts from x = 0, since x = 1 already
//      solves A·x = b and one sweep leaves it unchanged.
//   4. benchmark: call the optimized kernel `iterations` times on the same buffers without
//      resetting them, report seconds per call and GFLOP/s from the nominal FLOP count

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::error::{BenchError, Phase, Result};
use crate::hierarchy::MultigridHierarchy;
use crate::kernels::{KernelDispatcher, KernelKind};
use crate::reference;
use crate::vector::Vector;

/// Maximum accepted squared norm difference between optimized and reference results.
pub const VALIDATION_TOLERANCE: f64 = 1e-5;

pub struct Problem {
    pub hierarchy: MultigridHierarchy,
    /// Right-hand side (A·1).
    pub b: Vector,
    /// Optimized kernel output / state.
    pub x: Vector,
    /// Reference kernel output / state.
    pub x_ref: Vector,
}

impl Problem {
    pub fn new(n: usize, levels: usize) -> Result<Self> {
        let hierarchy = MultigridHierarchy::build(n, levels)?;
        let finest = hierarchy.finest();

        let mut b = Vector::new(finest.nrow)?;
        b.init_from_degree(&finest.nnzs)?;
        let mut x = Vector::new(finest.nrow)?;
        x.one_fill();
        let mut x_ref = Vector::new(finest.nrow)?;
        x_ref.one_fill();

        debug!(n, levels = ?hierarchy.sizes(), "problem initialised");
        Ok(Self {
            hierarchy,
            b,
            x,
            x_ref,
        })
    }

    pub fn nrow(&self) -> usize {
        self.hierarchy.finest().nrow
    }

    /// Starting state for validating `kind`: x = x_ref (zero for SYMGS, ones otherwise) and
    /// zeroed carries.
    pub fn seed(&mut self, kind: KernelKind) -> Result<()> {
        match kind {
            KernelKind::Symgs => self.x.zero_fill(),
            KernelKind::Spmv | KernelKind::Sptrsv => self.x.one_fill(),
        }
        self.x_ref = self.x.try_clone()?;
        self.hierarchy.finest_mut().reset_carry();
        Ok(())
    }
}

/// Run the optimized and the reference kernel once each and compare.
pub fn validate(dispatcher: &mut KernelDispatcher, problem: &mut Problem) -> Result<f64> {
    let kind = dispatcher.kind();
    problem.seed(kind)?;
    let Problem {
        hierarchy,
        b,
        x,
        x_ref,
    } = problem;
    let a = hierarchy.finest_mut();

    dispatcher.run_in(Phase::Validate, a, b, x)?;
    reference::run(kind, a, b, x_ref)?;

    let norm = x.squared_norm_difference(x_ref)?;
    if norm.is_nan() || norm > VALIDATION_TOLERANCE {
        return Err(BenchError::Validation {
            norm,
            tolerance: VALIDATION_TOLERANCE,
        });
    }

    info!(%kind, backend = dispatcher.backend_name(), norm, "validation passed");
    Ok(norm)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub seconds_per_iter: f64,
    pub gflops: f64,
}

/// GFLOP/s for one kernel call over `nrow` rows taking `seconds`.
pub fn gflops(kind: KernelKind, nrow: usize, seconds: f64) -> f64 {
    if seconds <= 0.0 {
        return f64::INFINITY;
    }
    (kind.flops_per_row() as f64) * (nrow as f64) * 1.0e-9 / seconds
}

/// Time `iterations` back-to-back kernel calls on the same buffers.
pub fn benchmark(
    dispatcher: &mut KernelDispatcher,
    problem: &mut Problem,
    iterations: usize,
) -> Result<Measurement> {
    if iterations == 0 {
        return Err(BenchError::Configuration(
            "iteration count must be positive".into(),
        ));
    }

    let Problem {
        hierarchy, b, x, ..
    } = problem;
    let a = hierarchy.finest_mut();
    let nrow = a.nrow;

    let start = Instant::now();
    for _ in 0..iterations {
        dispatcher.run_in(Phase::Benchmark, a, b, x)?;
    }
    let seconds_per_iter = start.elapsed().as_secs_f64() / iterations as f64;
    let gflops = gflops(dispatcher.kind(), nrow, seconds_per_iter);

    info!(
        kind = %dispatcher.kind(),
        backend = dispatcher.backend_name(),
        iterations,
        seconds_per_iter,
        gflops,
        "benchmark finished"
    );
    Ok(Measurement {
        seconds_per_iter,
        gflops,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub kind: KernelKind,
    pub backend: String,
    pub n: usize,
    pub nrow: usize,
    pub levels: Vec<usize>,
    pub iterations: usize,
    pub seconds_per_iter: f64,
    pub gflops: f64,
    /// `None` in benchmark-only mode.
    pub validation_norm: Option<f64>,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5} sec {:.5} gflops", self.seconds_per_iter, self.gflops)
    }
}

/// Full run: bind, build, (validate), benchmark.
pub fn run(cfg: &BenchConfig) -> Result<BenchReport> {
    let mut dispatcher = KernelDispatcher::new(cfg.kind, &cfg.backend)?;
    let mut problem = Problem::new(cfg.n, cfg.levels)?;

    let validation_norm = if cfg.validates() {
        Some(validate(&mut dispatcher, &mut problem)?)
    } else {
        None
    };

    let m = benchmark(&mut dispatcher, &mut problem, cfg.iterations)?;

    Ok(BenchReport {
        kind: cfg.kind,
        backend: dispatcher.backend_name().to_string(),
        n: cfg.n,
        nrow: problem.nrow(),
        levels: problem.hierarchy.sizes(),
        iterations: cfg.iterations,
        seconds_per_iter: m.seconds_per_iter,
        gflops: m.gflops,
        validation_norm,
    })
}

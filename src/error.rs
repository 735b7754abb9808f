// src/error.rs
//
// Error types for the harness.
//
// Every failure is fatal: nothing here is retried. `BenchError::phase` names the stage
// (init / validate / benchmark / report) so the driver can print a diagnostic that says
// where the run stopped.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

use crate::kernels::KernelKind;

/// Stage of a run, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Validate,
    Benchmark,
    Report,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Validate => "validate",
            Self::Benchmark => "benchmark",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Non-success status returned by a kernel implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelFault {
    #[error("{what} has length {actual}, expected at least {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("scratch buffer holds {actual} values, kernel needs {required}")]
    ScratchTooSmall { required: usize, actual: usize },

    #[error("backend `{backend}` does not provide a {kind} kernel")]
    Unsupported {
        backend: &'static str,
        kind: KernelKind,
    },

    #[error("kernel returned status {0}")]
    Status(i32),
}

impl KernelFault {
    /// Integer status in the C-style kernel convention (0 = success is never produced here).
    pub fn code(&self) -> i32 {
        match self {
            Self::ShapeMismatch { .. } => 1,
            Self::ScratchTooSmall { .. } => 2,
            Self::Unsupported { .. } => 3,
            Self::Status(code) => *code,
        }
    }
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to allocate {len} elements for {what}: {source}")]
    Resource {
        what: &'static str,
        len: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("kernel backend `{backend}` is unavailable: {reason}")]
    Linkage { backend: String, reason: String },

    #[error("wrong answer: squared norm difference {norm:e} exceeds tolerance {tolerance:e}")]
    Validation { norm: f64, tolerance: f64 },

    #[error("{kind} kernel failed during {phase}: {fault}")]
    Kernel {
        phase: Phase,
        kind: KernelKind,
        #[source]
        fault: KernelFault,
    },

    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Configuration(_)
            | Self::Resource { .. }
            | Self::Linkage { .. }
            | Self::LengthMismatch { .. } => Phase::Init,
            Self::Validation { .. } => Phase::Validate,
            Self::Kernel { phase, .. } => *phase,
            Self::Io(_) | Self::Json(_) => Phase::Report,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

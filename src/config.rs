// src/config.rs
//
// Run configuration.
//
// `BenchConfig` is built from the three positional values of the command line
// (kernel type, grid size, iterations) and validated before anything is allocated.
// Defaults for the optional knobs can be overridden through environment variables:
//
//   STENCIL_BENCH_BACKEND=<name>   kernel backend (default "portable")
//   STENCIL_BENCH_LEVELS=<k>       multigrid levels to build (default 4)
//
// `RunConfig` bundles the configuration with the measured report and is written as
// pretty JSON when the driver is asked to.

use std::fs::{File, create_dir_all};
use std::io::BufWriter;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::{BenchError, Result};
use crate::harness::BenchReport;
use crate::hierarchy::DEFAULT_LEVELS;
use crate::kernels::{DEFAULT_BACKEND, KernelKind};

/// Number of accepted kernel-type codes (3 kernels × 2 modes).
pub const KERNEL_TYPES: u32 = 6;

/// Grid sizes must be a multiple of this.
pub const GRID_MULTIPLE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    ValidateThenBenchmark,
    BenchmarkOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchConfig {
    pub kind: KernelKind,
    pub mode: RunMode,
    pub n: usize,
    pub iterations: usize,
    pub levels: usize,
    pub backend: String,
}

impl BenchConfig {
    /// Decode `kernel_type`: bit 0 set = benchmark only, `kernel_type / 2` = kernel.
    pub fn from_kernel_type(kernel_type: u32, n: usize, iterations: usize) -> Result<Self> {
        if kernel_type >= KERNEL_TYPES {
            return Err(BenchError::Configuration(format!(
                "kernel type {kernel_type} out of range [0, {KERNEL_TYPES})"
            )));
        }
        if n == 0 || n % GRID_MULTIPLE != 0 {
            return Err(BenchError::Configuration(format!(
                "grid size {n} must be a positive multiple of {GRID_MULTIPLE}"
            )));
        }
        if iterations == 0 {
            return Err(BenchError::Configuration(
                "iteration count must be positive".into(),
            ));
        }

        let kind = KernelKind::from_index(kernel_type / 2).ok_or_else(|| {
            BenchError::Configuration(format!("no kernel for type {kernel_type}"))
        })?;
        let mode = if kernel_type & 1 == 1 {
            RunMode::BenchmarkOnly
        } else {
            RunMode::ValidateThenBenchmark
        };

        Ok(Self {
            kind,
            mode,
            n,
            iterations,
            levels: DEFAULT_LEVELS,
            backend: DEFAULT_BACKEND.to_string(),
        })
    }

    /// Inverse of the kernel-type decoding.
    pub fn kernel_type(&self) -> u32 {
        self.kind.index() * 2 + u32::from(self.mode == RunMode::BenchmarkOnly)
    }

    pub fn validates(&self) -> bool {
        self.mode == RunMode::ValidateThenBenchmark
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Result<Self> {
        if levels == 0 {
            return Err(BenchError::Configuration(
                "at least one multigrid level is required".into(),
            ));
        }
        self.levels = levels;
        Ok(self)
    }

    /// Apply `STENCIL_BENCH_*` overrides from the environment.
    pub fn apply_env(self) -> Result<Self> {
        let mut cfg = self;
        if let Ok(v) = std::env::var("STENCIL_BENCH_BACKEND") {
            if !v.trim().is_empty() {
                cfg.backend = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("STENCIL_BENCH_LEVELS") {
            let levels = v.trim().parse::<usize>().map_err(|_| {
                BenchError::Configuration(format!("STENCIL_BENCH_LEVELS={v} is not a count"))
            })?;
            cfg = cfg.with_levels(levels)?;
        }
        Ok(cfg)
    }
}

#[derive(Debug, Serialize)]
pub struct RunInfo {
    pub binary: String,
    pub version: String,
    pub threads: usize,
    pub timestamp_unix_ms: u128,
}

impl RunInfo {
    pub fn current(binary: &str) -> Self {
        let timestamp_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self {
            binary: binary.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            threads: rayon::current_num_threads(),
            timestamp_unix_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub config: BenchConfig,
    pub report: BenchReport,
    pub run: RunInfo,
}

impl RunConfig {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

// src/main.rs
//
// Validate and benchmark one sparse kernel on a 27-point stencil problem.
//
//   stencil-bench <kernel-type> <n> <iterations> [--backend NAME] [--levels K] [--json PATH] [-v]
//
// kernel-type: 0/1 = SpMV, 2/3 = SpTRSV, 4/5 = SYMGS (odd = benchmark only).
// n must be a positive multiple of 8; the problem has n³ rows.
//
// Examples:
//
//   cargo run --release -- 0 64 1000
//       -> validate SpMV against the reference, then time 1000 calls
//
//   cargo run --release -- 5 128 50 --backend rayon --json runs/symgs.json
//       -> benchmark-only SYMGS with the rayon backend, run config + report as JSON
//
// The result line goes to stdout; logs and diagnostics go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stencil_bench::config::{BenchConfig, RunConfig, RunInfo};
use stencil_bench::error::{BenchError, Result};
use stencil_bench::harness::{self, BenchReport};
use stencil_bench::kernels::backend_names;

/// Sparse stencil kernel validation and throughput harness
#[derive(Parser, Debug)]
#[command(name = "stencil-bench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Kernel type in [0, 6): kernel = type / 2, odd = benchmark only
    #[arg(value_name = "KERNEL_TYPE")]
    kernel_type: u32,

    /// Grid edge length (positive multiple of 8)
    #[arg(value_name = "N")]
    n: usize,

    /// Timed kernel calls
    #[arg(value_name = "ITERATIONS")]
    iterations: usize,

    /// Kernel backend (overrides STENCIL_BENCH_BACKEND)
    #[arg(short, long)]
    backend: Option<String>,

    /// Multigrid levels to build (overrides STENCIL_BENCH_LEVELS)
    #[arg(short, long)]
    levels: Option<usize>,

    /// Write run config and report as pretty JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn config_from(cli: &Cli) -> Result<BenchConfig> {
    let mut cfg =
        BenchConfig::from_kernel_type(cli.kernel_type, cli.n, cli.iterations)?.apply_env()?;
    if let Some(backend) = &cli.backend {
        cfg = cfg.with_backend(backend.clone());
    }
    if let Some(levels) = cli.levels {
        cfg = cfg.with_levels(levels)?;
    }
    Ok(cfg)
}

fn execute(cli: &Cli) -> Result<BenchReport> {
    let cfg = config_from(cli)?;
    tracing::info!(
        kind = %cfg.kind,
        n = cfg.n,
        iterations = cfg.iterations,
        backend = %cfg.backend,
        validate = cfg.validates(),
        "starting run"
    );

    let report = harness::run(&cfg)?;

    if let Some(path) = &cli.json {
        let run = RunConfig {
            config: cfg,
            report: report.clone(),
            run: RunInfo::current("stencil-bench"),
        };
        run.write_to(path)?;
        tracing::info!(path = %path.display(), "wrote run config");
    }
    Ok(report)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {} failed: {err}", err.phase());
            if matches!(err, BenchError::Linkage { .. }) {
                eprintln!("available backends: {}", backend_names().join(", "));
            }
            ExitCode::FAILURE
        }
    }
}

// src/bin/kernel_sweep.rs
//
// Developer diagnostic: validate and time every registered backend for every kernel
// over a range of grid sizes.
//
// This tool:
//   - prints a table to stdout only
//   - does NOT write files
//   - keeps going when one combination fails (the failure is printed in its row)
//
// Usage examples:
//   cargo run --release --bin kernel_sweep
//   cargo run --release --bin kernel_sweep -- 200 16 32 64

use stencil_bench::config::BenchConfig;
use stencil_bench::harness;
use stencil_bench::kernels::{KernelKind, backend_names};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let iterations = args
        .get(1)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(100);
    let mut sizes: Vec<usize> = args
        .iter()
        .skip(2)
        .filter_map(|s| s.parse::<usize>().ok())
        .collect();
    if sizes.is_empty() {
        sizes = vec![16, 32, 64];
    }

    println!(
        "{:<8} {:<10} {:>5} {:>12} {:>12} {:>10}",
        "kernel", "backend", "n", "sec/iter", "gflops", "norm"
    );

    for &n in &sizes {
        for kind in KernelKind::ALL {
            for backend in backend_names() {
                let cfg = match BenchConfig::from_kernel_type(kind.index() * 2, n, iterations) {
                    Ok(cfg) => cfg.with_backend(backend),
                    Err(e) => {
                        println!("{:<8} {:<10} {:>5}  {e}", kind, backend, n);
                        continue;
                    }
                };
                match harness::run(&cfg) {
                    Ok(r) => println!(
                        "{:<8} {:<10} {:>5} {:>12.5e} {:>12.5} {:>10.2e}",
                        kind,
                        backend,
                        n,
                        r.seconds_per_iter,
                        r.gflops,
                        r.validation_norm.unwrap_or(f64::NAN)
                    ),
                    Err(e) => println!(
                        "{:<8} {:<10} {:>5}  {} failed: {e}",
                        kind,
                        backend,
                        n,
                        e.phase()
                    ),
                }
            }
        }
    }
}

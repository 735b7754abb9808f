// tests/validation.rs
//
// Integration-style validation tests (matrix structure, kernel agreement, harness runs).
// Run with: cargo test
// Or only these tests: cargo test --test validation

use stencil_bench::config::{BenchConfig, RunMode};
use stencil_bench::error::{BenchError, Phase};
use stencil_bench::harness::{self, Problem, VALIDATION_TOLERANCE};
use stencil_bench::hierarchy::MultigridHierarchy;
use stencil_bench::kernels::{KernelDispatcher, KernelKind, backend_names};
use stencil_bench::matrix::{DIAG_VALUE, StencilMatrix};
use stencil_bench::reference;
use stencil_bench::vector::Vector;

fn ones(len: usize) -> Vector {
    let mut v = Vector::new(len).unwrap();
    v.one_fill();
    v
}

#[test]
fn row_degrees_follow_the_grid_stencil() {
    let a = StencilMatrix::build(8).unwrap();
    assert_eq!(a.nrow, 8 * 8 * 8);
    for row in 0..a.nrow {
        let neighbours = a.grid.stencil_points(row) - 1;
        assert_eq!(usize::from(a.nnzs[row]) - 1, neighbours, "row {row}");
        assert_eq!(a.diag[row], DIAG_VALUE);
    }
    // corners see 7 neighbours, interior cells 26
    assert_eq!(a.nnzs[a.grid.idx(0, 0, 0)], 8);
    assert_eq!(a.nnzs[a.grid.idx(7, 7, 7)], 8);
    assert_eq!(a.nnzs[a.grid.idx(3, 4, 5)], 27);
}

#[test]
fn spmv_of_ones_reproduces_degree_rhs() {
    let mut p = Problem::new(8, 1).unwrap();
    let ones = ones(p.nrow());

    let mut y = Vector::new(p.nrow()).unwrap();
    reference::spmv(p.hierarchy.finest(), &ones, &mut y).unwrap();
    assert_eq!(y.as_slice(), p.b.as_slice());

    let a = p.hierarchy.finest_mut();
    let interior = a.grid.idx(4, 4, 4);
    let corner = a.grid.idx(0, 0, 0);
    assert_eq!(y.as_slice()[interior], 0.0);
    assert_eq!(y.as_slice()[corner], 19.0);

    for backend in backend_names() {
        let mut d = KernelDispatcher::new(KernelKind::Spmv, backend).unwrap();
        let mut z = Vector::new(a.nrow).unwrap();
        d.run(a, &ones, &mut z).unwrap();
        assert_eq!(z.as_slice(), y.as_slice(), "{backend}");
    }
}

#[test]
fn every_backend_validates_every_kernel() {
    // n = 16 gives 4096 rows, enough for several rayon row blocks
    for n in [8, 16] {
        for kind in KernelKind::ALL {
            for backend in backend_names() {
                let cfg = BenchConfig::from_kernel_type(kind.index() * 2, n, 3)
                    .unwrap()
                    .with_backend(backend);
                let report = harness::run(&cfg)
                    .unwrap_or_else(|e| panic!("{kind} on {backend} at n={n}: {e}"));
                let norm = report.validation_norm.unwrap();
                assert!(norm <= VALIDATION_TOLERANCE, "{kind} {backend}: {norm}");
                assert!(report.gflops > 0.0);
            }
        }
    }
}

#[test]
fn validate_then_benchmark_small_spmv() {
    let cfg = BenchConfig::from_kernel_type(0, 8, 1).unwrap();
    assert_eq!(cfg.mode, RunMode::ValidateThenBenchmark);
    let report = harness::run(&cfg).unwrap();
    assert!(report.validation_norm.unwrap() <= 1e-5);
    assert_eq!(report.levels, vec![8, 4, 2, 1]);
    assert_eq!(report.nrow, 512);
}

#[test]
fn benchmark_only_reports_positive_throughput() {
    let cfg = BenchConfig::from_kernel_type(1, 8, 1000).unwrap();
    assert_eq!(cfg.mode, RunMode::BenchmarkOnly);
    let report = harness::run(&cfg).unwrap();
    assert!(report.validation_norm.is_none());
    assert!(report.seconds_per_iter >= 0.0);
    assert!(report.gflops > 0.0);

    let line = report.to_string();
    assert!(line.ends_with(" gflops"), "{line}");
    assert!(line.contains(" sec "), "{line}");
}

#[test]
fn unknown_backend_fails_at_init() {
    let cfg = BenchConfig::from_kernel_type(4, 8, 1)
        .unwrap()
        .with_backend("avx512");
    let err = harness::run(&cfg).unwrap_err();
    assert!(matches!(err, BenchError::Linkage { .. }), "{err}");
    assert_eq!(err.phase(), Phase::Init);
}

#[test]
fn four_level_hierarchy_from_64() {
    let h = MultigridHierarchy::build(64, 4).unwrap();
    assert_eq!(h.depth(), 4);
    assert_eq!(h.sizes(), vec![64, 32, 16, 8]);

    for pair in h.levels.windows(2) {
        let (fine, coarse) = (&pair[0], &pair[1]);
        let link = fine.linkage.as_ref().unwrap();
        assert_eq!(link.f2c_operator.len(), coarse.matrix.nrow);
        assert_eq!(link.rc.len(), coarse.matrix.nrow);
        assert_eq!(link.xc.len(), coarse.matrix.nrow);
        assert_eq!(link.axf.len(), fine.matrix.nrow);
        assert!(
            link.f2c_operator
                .iter()
                .all(|&f| (f as usize) < fine.matrix.nrow)
        );
    }
    assert!(h.levels[3].linkage.is_none());
}

#[test]
fn symgs_smooths_on_every_backend() {
    for backend in backend_names() {
        let mut a = StencilMatrix::build(8).unwrap();
        let b = Vector::new(a.nrow).unwrap();
        let mut x = ones(a.nrow);
        let mut d = KernelDispatcher::new(KernelKind::Symgs, backend).unwrap();

        let mut prev = reference::residual_norm_sq(&a, &x, &b).unwrap();
        for sweep in 0..6 {
            d.run(&mut a, &b, &mut x).unwrap();
            let res = reference::residual_norm_sq(&a, &x, &b).unwrap();
            assert!(res < prev, "{backend} sweep {sweep}: {res} >= {prev}");
            prev = res;
        }
    }
}

#[test]
fn backends_track_reference_over_repeated_sweeps() {
    // b = 0 and x = 1 is not a solution, so every sweep moves x and reuses the carry.
    for kind in [KernelKind::Sptrsv, KernelKind::Symgs] {
        for backend in backend_names() {
            let mut a = StencilMatrix::build(8).unwrap();
            let b = Vector::new(a.nrow).unwrap();
            let mut x = ones(a.nrow);
            let mut x_ref = x.try_clone().unwrap();
            let mut d = KernelDispatcher::new(kind, backend).unwrap();

            for sweep in 0..3 {
                d.run(&mut a, &b, &mut x).unwrap();
                reference::run(kind, &mut a, &b, &mut x_ref).unwrap();
                let norm = x.squared_norm_difference(&x_ref).unwrap();
                assert!(
                    norm <= VALIDATION_TOLERANCE,
                    "{kind} on {backend}, sweep {sweep}: {norm}"
                );
            }
            let moved = x.squared_norm_difference(&ones(a.nrow)).unwrap();
            assert!(moved > 1.0, "{kind} on {backend} left x near 1: {moved}");
        }
    }
}

#[test]
fn reference_kernels_are_deterministic() {
    for kind in KernelKind::ALL {
        let mut outputs = Vec::new();
        for _ in 0..2 {
            let mut p = Problem::new(8, 1).unwrap();
            let Problem { hierarchy, b, x, .. } = &mut p;
            let a = hierarchy.finest_mut();
            for _ in 0..3 {
                reference::run(kind, a, b, x).unwrap();
            }
            outputs.push(x.as_slice().to_vec());
        }
        assert_eq!(outputs[0], outputs[1], "{kind}");
    }
}

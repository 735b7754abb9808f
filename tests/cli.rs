// tests/cli.rs
//
// End-to-end checks of the `stencil-bench` binary: result line on stdout, phase-named
// diagnostics on stderr, nonzero exit on failure.

use std::process::{Command, Output};

fn stencil_bench(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stencil-bench"))
        .args(args)
        .env_remove("STENCIL_BENCH_BACKEND")
        .env_remove("STENCIL_BENCH_LEVELS")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch stencil-bench")
}

/// Parse `"<sec> sec <gflops> gflops"`.
fn parse_result_line(stdout: &[u8]) -> (f64, f64) {
    let text = String::from_utf8_lossy(stdout);
    let line = text.trim();
    let parts: Vec<&str> = line.split_whitespace().collect();
    assert_eq!(parts.len(), 4, "unexpected output: {line:?}");
    assert_eq!(parts[1], "sec");
    assert_eq!(parts[3], "gflops");
    (parts[0].parse().unwrap(), parts[2].parse().unwrap())
}

#[test]
fn validated_spmv_run_prints_one_result_line() {
    let out = stencil_bench(&["0", "8", "1"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let (sec, _) = parse_result_line(&out.stdout);
    assert!(sec >= 0.0);
}

#[test]
fn benchmark_only_run_reports_positive_gflops() {
    let out = stencil_bench(&["1", "8", "1000"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let (_, gflops) = parse_result_line(&out.stdout);
    assert!(gflops > 0.0);
}

#[test]
fn malformed_arguments_fail_in_init() {
    for args in [["6", "8", "1"], ["0", "12", "1"], ["0", "8", "0"]] {
        let out = stencil_bench(&args);
        assert!(!out.status.success(), "{args:?} succeeded");
        assert!(out.stdout.is_empty());
        let err = String::from_utf8_lossy(&out.stderr);
        assert!(err.contains("init failed"), "{args:?}: {err}");
    }
}

#[test]
fn unknown_backend_lists_available_ones() {
    let out = stencil_bench(&["2", "8", "1", "--backend", "nope"]);
    assert!(!out.status.success());
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("init failed"), "{err}");
    assert!(err.contains("portable"), "{err}");
}

#[test]
fn json_report_is_written() {
    let dir = std::env::temp_dir().join(format!("stencil-bench-cli-{}", std::process::id()));
    let path = dir.join("run.json");
    let out = stencil_bench(&[
        "4",
        "8",
        "2",
        "--backend",
        "rayon",
        "--json",
        path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let text = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["config"]["kind"], "symgs");
    assert_eq!(json["config"]["backend"], "rayon");
    assert_eq!(json["report"]["iterations"], 2);
    assert!(json["report"]["validation_norm"].as_f64().unwrap() <= 1e-5);

    let _ = std::fs::remove_dir_all(&dir);
}

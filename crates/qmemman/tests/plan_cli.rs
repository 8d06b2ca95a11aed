use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const MIB: i64 = 1024 * 1024;

fn qmemman_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_qmemman"))
}

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

/// Config where preferred memory equals the working set, so fixtures can
/// be reasoned about in round MiB.
fn flat_config(dir: &Path) -> PathBuf {
    let path = dir.join("qmemman.toml");
    fs::write(&path, "[policy]\ncache_factor = 1.0\n").expect("write config");
    path
}

fn run_json(args: &[&str], config: &Path) -> serde_json::Value {
    let output = qmemman_cmd()
        .args(["--format", "json", "--config"])
        .arg(config)
        .args(args)
        .output()
        .expect("run qmemman");
    assert!(
        output.status.success(),
        "qmemman {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

#[test]
fn balance_scarcity_scenario() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = flat_config(tmp.path());
    let snapshot = fixture("scarcity.toml");

    let json = run_json(&["balance", snapshot.to_str().unwrap()], &config);

    let requests = json["requests"].as_array().expect("requests array");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["domain"], 1);
    assert_eq!(requests[0]["target_bytes"], 300 * MIB);
    assert_eq!(requests[1]["domain"], 2);
    assert_eq!(requests[1]["target_bytes"], 300 * MIB);
    // Domain 3 sent garbage and is left out.
    assert_eq!(json["rejected_reports"], 1);
}

#[test]
fn balloon_frees_at_least_the_request() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = flat_config(tmp.path());
    let snapshot = fixture("scarcity.toml");
    let requested = 100 * MIB;

    let json = run_json(
        &[
            "balloon",
            snapshot.to_str().unwrap(),
            "--bytes",
            &requested.to_string(),
        ],
        &config,
    );

    let requests = json["requests"].as_array().expect("requests array");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["domain"], 1);
    let delta = requests[0]["delta"].as_i64().unwrap();
    assert!(-delta >= requested, "freed {} < {requested}", -delta);
}

#[test]
fn balloon_infeasible_request_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = flat_config(tmp.path());
    let output = qmemman_cmd()
        .arg("--config")
        .arg(&config)
        .arg("balloon")
        .arg(fixture("scarcity.toml"))
        .args(["--bytes", &(201 * MIB).to_string()])
        .output()
        .expect("run qmemman balloon");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot free"), "stderr: {stderr}");
}

#[test]
fn check_meminfo_accepts_valid_report() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = flat_config(tmp.path());
    let report = tmp.path().join("meminfo");
    fs::write(
        &report,
        "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 100 kB\nCached: 100 kB\n\
         SwapTotal: 50 kB\nSwapFree: 50 kB\n",
    )
    .expect("write report");

    let json = run_json(&["check-meminfo", report.to_str().unwrap()], &config);
    assert_eq!(json["accepted"], true);
    assert_eq!(json["mem_used"], 700 * 1024);
    assert_eq!(json["meminfo"]["mem_total"], 1000 * 1024);
}

#[test]
fn check_meminfo_rejects_inconsistent_report() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = flat_config(tmp.path());
    let report = tmp.path().join("meminfo");
    fs::write(
        &report,
        "MemTotal: 10\nMemFree: 0\nBuffers: 0\nCached: 0\nSwapTotal: 1\nSwapFree: 2\n",
    )
    .expect("write report");

    let output = qmemman_cmd()
        .arg("--config")
        .arg(&config)
        .arg("check-meminfo")
        .arg(&report)
        .output()
        .expect("run qmemman check-meminfo");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rejected"), "stderr: {stderr}");
    assert!(stderr.contains("SwapFree"), "stderr: {stderr}");
}

#[test]
fn missing_snapshot_reports_read_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = flat_config(tmp.path());
    let output = qmemman_cmd()
        .arg("--config")
        .arg(&config)
        .arg("balance")
        .arg(tmp.path().join("not-found.toml"))
        .output()
        .expect("run qmemman balance");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read snapshot"), "stderr: {stderr}");
    assert!(stderr.contains("not-found.toml"), "stderr: {stderr}");
}

#[test]
fn invalid_config_is_refused() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[policy]\ncache_factor = 0.2\n").expect("write config");

    let output = qmemman_cmd()
        .arg("--config")
        .arg(&config)
        .arg("balance")
        .arg(fixture("scarcity.toml"))
        .output()
        .expect("run qmemman balance");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cache_factor"), "stderr: {stderr}");
}

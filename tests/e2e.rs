use std::process::Command;

const CONFIG: &str = "tests/fixtures/rewards.toml";

fn run_with(fixture: &str, envs: &[(&str, &str)]) -> (String, String, bool) {
    let path = format!("tests/fixtures/{fixture}");
    let output = Command::new(env!("CARGO_BIN_EXE_rewards-ledger"))
        .arg(&path)
        .arg(CONFIG)
        .env("RUST_LOG", "warn")
        .envs(envs.iter().copied())
        .output()
        .expect("failed to run binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run(fixture: &str) -> (String, String, bool) {
    run_with(fixture, &[])
}

#[test]
fn valid_requests() {
    let (stdout, stderr, success) = run("valid.csv");

    assert!(success);
    assert!(stderr.is_empty(), "unexpected stderr: {stderr}");

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "user,points,coins",
            "alice,2000,0",
            "bob,1000,0",
            "carol,1000,0",
        ]
    );
}

#[test]
fn redemptions_are_written_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("redemptions.csv");
    let out_str = out.to_str().unwrap();

    let (_, _, success) = run_with("valid.csv", &[("REWARDS_OUTPUT__REDEMPTIONS", out_str)]);
    assert!(success);

    // repeated exchange by alice reused her code, carol got the next one
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, "user,prize,code\nalice,mug,XYZ1\ncarol,mug,XYZ2\n");
}

#[test]
fn deduct_policy_from_environment() {
    let (stdout, _, success) = run_with(
        "valid.csv",
        &[("REWARDS_POLICY__EXCHANGE_COST", "deduct")],
    );

    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[1], "alice,1900,0");
    assert_eq!(lines[3], "carol,900,0");
}

#[test]
fn errors_warn_but_do_not_block() {
    let (stdout, stderr, success) = run("with_errors.csv");

    assert!(success);
    assert!(stderr.contains("unrecognized request type"));
    assert!(stderr.contains("missing argument"));

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "user,points,coins");
    assert_eq!(lines[1], "alice,2000,0");
}

#[test]
fn missing_input_fails_with_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_rewards-ledger"))
        .output()
        .expect("failed to run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: rewards-ledger"));
}

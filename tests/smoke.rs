//! Smoke tests -- exercise the CLI paths that need no database.

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("integrity-signals").unwrap();
    cmd.env_remove("DATABASE_URL")
        .env_remove("INTEGRITY_SIGNALS_CONFIG");
    cmd
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Aggregate-only integrity signal reporting"));
}

#[test]
fn test_cli_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("integrity-signals"));
}

#[test]
fn test_signal_types_lists_catalog() {
    cli()
        .arg("signal-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. suspicious_timing_pattern"))
        .stdout(predicate::str::contains("multiple_submissions_same_device"));
}

#[test]
fn test_signal_types_json() {
    let output = cli().args(["signal-types", "--json"]).output().unwrap();
    assert!(output.status.success());
    let catalog: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(catalog.as_array().unwrap().len(), 4);
    assert_eq!(catalog[2]["key"], "sudden_score_spikes");
}

#[test]
fn test_validate_accepts_recent_payload() {
    let timestamp = integrity_signals::time::format_iso8601(chrono::Utc::now());
    let payload = format!(r#"{{"type": "sudden_score_spikes", "timestamp": "{timestamp}"}}"#);
    cli()
        .args(["validate", "--payload", &payload])
        .assert()
        .success()
        .stdout("ok\n");
}

#[test]
fn test_validate_reports_every_violation() {
    cli()
        .args([
            "validate",
            "--payload",
            r#"{"type": "late_homework", "timestamp": "soon", "source": "fax"}"#,
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Signal type 'late_homework' is not allowed."))
        .stdout(predicate::str::contains("Timestamp must be valid ISO-8601."))
        .stdout(predicate::str::contains("Source is not allowed."));
}

#[test]
fn test_submit_rejects_before_touching_storage() {
    cli()
        .args(["submit", "--type", "late_homework"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_unknown_window_is_rejected() {
    cli()
        .args(["aggregate", "--window", "month"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("window must be 'day' or 'week'"));
}

#[test]
fn test_explicit_config_must_exist() {
    cli()
        .args(["--config", "/nonexistent/integrity.toml", "signal-types"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

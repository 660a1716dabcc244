//! CLI integration tests

use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn bundled_manifest() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../models/booking-cancellation/manifest.json")
        .display()
        .to_string()
}

fn hcr(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "hcr-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn booking(previous_cancellations: u32) -> Value {
    json!({
        "hotel": "City Hotel",
        "lead_time": 0,
        "meal": "BB",
        "market_segment": "Online TA",
        "distribution_channel": "TA/TO",
        "is_repeated_guest": 0,
        "previous_cancellations": previous_cancellations,
        "previous_bookings_not_canceled": 0,
        "reserved_room_type": "A",
        "assigned_room_type": "A",
        "booking_changes": 0,
        "deposit_type": "Non Refund",
        "days_in_waiting_list": 0,
        "customer_type": "Transient",
        "adr": 50.0,
        "required_car_parking_spaces": 0,
        "total_of_special_requests": 0,
        "total_stays": 1,
        "total_guests": 1,
        "has_agent": 0,
        "has_company": 0,
        "arrival_month_num": 1
    })
}

fn write_input(dir: &TempDir, value: &Value) -> String {
    let path = dir.path().join("bookings.json");
    fs::write(&path, value.to_string()).unwrap();
    path.display().to_string()
}

#[test]
fn test_cli_help() {
    let output = hcr(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Hotel Cancellation Risk"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("remote"), "Should show remote command");
    assert!(stdout.contains("model"), "Should show model command");
    assert!(stdout.contains("schema"), "Should show schema command");
}

#[test]
fn test_cli_version() {
    let output = hcr(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("hcr"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = hcr(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--manifest"));
    assert!(stdout.contains("--input"));
    assert!(stdout.contains("--threshold"));
}

#[test]
fn test_schema_json_lists_fields() {
    let output = hcr(&["--format", "json", "schema"]);
    assert!(output.status.success());

    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 24);
    assert_eq!(rows[0]["field"], "hotel");
}

#[test]
fn test_predict_local_single_booking() {
    let dir = TempDir::new().unwrap();
    let manifest = bundled_manifest();

    let low = write_input(&dir, &booking(0));
    let output = hcr(&["--format", "json", "predict", "--manifest", &manifest, "--input", &low]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["label"], "not_cancelled");
    assert_eq!(result["model_version"], "2024.06-logreg");

    let high = write_input(&dir, &booking(5));
    let output = hcr(&["--format", "json", "predict", "--manifest", &manifest, "--input", &high]);
    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["label"], "cancelled");
}

#[test]
fn test_predict_rejects_several_bookings() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &json!([booking(0), booking(5)]));
    let manifest = bundled_manifest();

    let output = hcr(&["--format", "json", "predict", "--manifest", &manifest, "--input", &input]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("one booking per run"), "{}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_predict_threshold_override() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &booking(2));
    let manifest = bundled_manifest();

    let output = hcr(&[
        "--format", "json", "predict", "--manifest", &manifest, "--input", &input,
        "--threshold", "0.6",
    ]);
    assert!(output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["label"], "not_cancelled");
    assert_eq!(result["threshold"], 0.6);
}

#[test]
fn test_predict_rejects_invalid_booking() {
    let dir = TempDir::new().unwrap();
    let mut invalid = booking(0);
    invalid.as_object_mut().unwrap().remove("adr");
    let input = write_input(&dir, &invalid);
    let manifest = bundled_manifest();

    let output = hcr(&["predict", "--manifest", &manifest, "--input", &input]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("adr"), "{}", stderr);
}

#[test]
fn test_predict_with_missing_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &booking(0));
    let manifest = dir.path().join("manifest.json").display().to_string();

    let output = hcr(&["predict", "--manifest", &manifest, "--input", &input]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load model artifact"));
}

#[test]
fn test_model_json_summary() {
    let manifest = bundled_manifest();
    let output = hcr(&["--format", "json", "model", "--manifest", &manifest]);
    assert!(output.status.success());

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["format"], "logistic");
    assert_eq!(summary["features"].as_array().unwrap().len(), 54);
}

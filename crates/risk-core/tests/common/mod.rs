//! Shared fixtures for risk-core integration tests

#![allow(dead_code)]

use risk_core::{GatewayConfig, InterpreterConfig, ModelGateway, RawBooking, RiskPipeline};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory of the demo artifact shipped with the repository
pub fn bundled_model_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models/booking-cancellation")
}

pub fn bundled_manifest() -> PathBuf {
    bundled_model_dir().join("manifest.json")
}

/// Copy the demo artifact into `dir` so tests can tamper with it
pub fn copy_bundled(dir: &Path) -> PathBuf {
    for file in ["manifest.json", "model.json"] {
        fs::copy(bundled_model_dir().join(file), dir.join(file)).unwrap();
    }
    dir.join("manifest.json")
}

/// Rewrite the manifest at `path` through `edit`
pub fn edit_manifest(path: &Path, edit: impl FnOnce(&mut Value)) {
    let mut manifest: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    edit(&mut manifest);
    fs::write(path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
}

pub fn warm_pipeline(threshold: Option<f64>) -> RiskPipeline {
    let gateway = Arc::new(ModelGateway::new(GatewayConfig::new(bundled_manifest())));
    let config = InterpreterConfig {
        threshold,
        ..InterpreterConfig::default()
    };
    RiskPipeline::warm_up(gateway, &config).unwrap_or_else(|e| panic!("warm up failed: {}", e))
}

pub fn as_raw(value: Value) -> RawBooking {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

/// Short lead time, non-refundable, no cancellation history
pub fn low_risk_booking() -> RawBooking {
    as_raw(json!({
        "hotel": "City Hotel",
        "lead_time": 0,
        "meal": "BB",
        "market_segment": "Online TA",
        "distribution_channel": "TA/TO",
        "is_repeated_guest": 0,
        "previous_cancellations": 0,
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
        "room_assigned_different": 0,
        "arrival_month_num": 1,
        "lead_time_category": "last_minute"
    }))
}

/// Long lead time, refundable, five previous cancellations
pub fn high_risk_booking() -> RawBooking {
    let mut raw = low_risk_booking();
    raw.insert("lead_time".into(), json!(300));
    raw.insert("previous_cancellations".into(), json!(5));
    raw.insert("deposit_type".into(), json!("No Deposit"));
    raw.insert("adr".into(), json!(100.0));
    raw.insert("lead_time_category".into(), json!("long"));
    raw
}

/// Every numeric field at its minimum
pub fn minimum_booking() -> RawBooking {
    let mut raw = low_risk_booking();
    raw.insert("adr".into(), json!(0));
    raw.remove("room_assigned_different");
    raw.remove("lead_time_category");
    raw
}

/// Every numeric field at its maximum
pub fn maximum_booking() -> RawBooking {
    let mut raw = low_risk_booking();
    for (field, value) in [
        ("lead_time", json!(365)),
        ("is_repeated_guest", json!(1)),
        ("previous_cancellations", json!(20)),
        ("previous_bookings_not_canceled", json!(20)),
        ("booking_changes", json!(10)),
        ("days_in_waiting_list", json!(365)),
        ("adr", json!(1000.0)),
        ("required_car_parking_spaces", json!(5)),
        ("total_of_special_requests", json!(5)),
        ("total_stays", json!(30)),
        ("total_guests", json!(10)),
        ("has_agent", json!(1)),
        ("has_company", json!(1)),
        ("room_assigned_different", json!(1)),
        ("arrival_month_num", json!(12)),
        ("lead_time_category", json!("long")),
    ] {
        raw.insert(field.into(), value);
    }
    raw
}

/// Manifest of an ONNX fixture under `tests/fixtures`
pub fn fixture_manifest(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(format!("{}.manifest.json", name))
}

/// Copy an ONNX fixture and its manifest into `dir`
pub fn copy_fixture(dir: &Path, name: &str) -> PathBuf {
    let source = fixture_manifest(name);
    let fixtures = source.parent().unwrap();
    let onnx = format!("{}.onnx", name);
    fs::copy(fixtures.join(&onnx), dir.join(&onnx)).unwrap();
    let manifest = dir.join(format!("{}.manifest.json", name));
    fs::copy(&source, &manifest).unwrap();
    manifest
}

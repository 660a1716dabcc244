//! Observability infrastructure for risk scoring
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes by label, failures, model version)
//! - Structured logging of pipeline events with tracing

use crate::error::{LoadError, PipelineError, ValidationError};
use crate::models::PredictionResult;
use crate::schema::BookingField;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// `field` label for names outside the booking schema
pub const UNEXPECTED_FIELD_LABEL: &str = "<unexpected>";

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RiskMetricsInner> = OnceLock::new();

struct RiskMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    validation_failures_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    model_load_failures_total: IntCounter,
    model_version_info: GaugeVec,
}

impl RiskMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "booking_risk_prediction_latency_seconds",
                "End-to-end time to assess one booking",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "booking_risk_predictions_total",
                "Completed assessments by label and active policy",
                &["label", "policy"]
            )
            .expect("Failed to register predictions_total"),

            validation_failures_total: register_int_counter_vec!(
                "booking_risk_validation_failures_total",
                "Rejected booking records by field and reason",
                &["field", "reason"]
            )
            .expect("Failed to register validation_failures_total"),

            prediction_errors_total: register_int_counter_vec!(
                "booking_risk_prediction_errors_total",
                "Failed assessments that passed validation, by stage",
                &["stage"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_load_failures_total: register_int_counter!(
                "booking_risk_model_load_failures_total",
                "Model artifact load failures"
            )
            .expect("Failed to register model_load_failures_total"),

            model_version_info: register_gauge_vec!(
                "booking_risk_model_version_info",
                "Information about the currently loaded model",
                &["version", "format"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Risk metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct RiskMetrics {
    _private: (),
}

impl Default for RiskMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RiskMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RiskMetricsInner {
        GLOBAL_METRICS.get_or_init(RiskMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn record_prediction(&self, result: &PredictionResult) {
        self.inner()
            .predictions_total
            .with_label_values(&[result.label.as_str(), result.policy.as_str()])
            .inc();
    }

    /// Count a rejected record; caller-chosen field names share one series
    pub fn record_validation_failure(&self, error: &ValidationError) {
        let field = BookingField::from_name(&error.field)
            .map(|f| f.name())
            .unwrap_or(UNEXPECTED_FIELD_LABEL);
        self.inner()
            .validation_failures_total
            .with_label_values(&[field, error.reason.code()])
            .inc();
    }

    pub fn record_prediction_error(&self, error: &PipelineError) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[error.reached.as_str()])
            .inc();
    }

    pub fn inc_model_load_failures(&self) {
        self.inner().model_load_failures_total.inc();
    }

    /// Replace the model version info series
    pub fn set_model_version(&self, version: &str, format: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, format])
            .set(1.0);
    }
}

/// Structured logger for pipeline events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_prediction(&self, result: &PredictionResult, elapsed_us: u64) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            probability = result.probability,
            label = result.label.as_str(),
            policy = result.policy.as_str(),
            threshold = result.threshold,
            model_version = %result.model_version,
            elapsed_us = elapsed_us,
            "Booking assessed"
        );
    }

    pub fn log_validation_failure(&self, error: &ValidationError) {
        debug!(
            event = "validation_failed",
            service = %self.service,
            field = %error.field,
            reason = error.reason.code(),
            detail = %error.reason,
            "Booking record rejected"
        );
    }

    pub fn log_prediction_failure(&self, error: &PipelineError) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            reached = error.reached.as_str(),
            error = %error.cause,
            "Booking assessment failed"
        );
    }

    pub fn log_model_loaded(&self, version: &str, format: &str, features: usize, checksum: &str) {
        info!(
            event = "model_loaded",
            service = %self.service,
            model_version = %version,
            format = %format,
            features = features,
            checksum = %checksum,
            "Cancellation model ready"
        );
    }

    pub fn log_model_load_failed(&self, error: &LoadError) {
        warn!(
            event = "model_load_failed",
            service = %self.service,
            error = %error,
            "Cancellation model could not be loaded"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            model_version = %model_version,
            addr = %addr,
            "Risk service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Risk service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationReason;
    use crate::models::{ActivePolicy, CancellationLabel};

    #[test]
    fn test_metrics_record_without_panicking() {
        let metrics = RiskMetrics::new();
        let result = PredictionResult {
            probability: 0.8,
            complement: 0.2,
            label: CancellationLabel::Cancelled,
            policy: ActivePolicy::Threshold,
            threshold: 0.5,
            model_version: "v1".to_string(),
            generated_at: 0,
        };
        metrics.observe_prediction_latency(0.0004);
        metrics.record_prediction(&result);
        metrics.record_validation_failure(&ValidationError::new("adr", ValidationReason::Missing));
        metrics.set_model_version("v1", "logistic");
        metrics.inc_model_load_failures();

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "booking_risk_predictions_total"));
    }

    fn unexpected_series() -> Vec<String> {
        prometheus::gather()
            .iter()
            .filter(|f| f.get_name() == "booking_risk_validation_failures_total")
            .flat_map(|f| f.get_metric().iter())
            .filter(|m| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == "reason" && l.get_value() == "unexpected")
            })
            .flat_map(|m| m.get_label().iter())
            .filter(|l| l.get_name() == "field")
            .map(|l| l.get_value().to_string())
            .collect()
    }

    #[test]
    fn test_unknown_field_names_share_one_series() {
        let metrics = RiskMetrics::new();
        for i in 0..50 {
            let name = format!("extra_field_{}", i);
            metrics.record_validation_failure(&ValidationError::new(name, ValidationReason::Unexpected));
        }
        metrics.record_validation_failure(&ValidationError::new("adr", ValidationReason::Unexpected));

        let fields = unexpected_series();
        assert!(fields.iter().all(|f| f == UNEXPECTED_FIELD_LABEL || f == "adr"), "{:?}", fields);
        assert!(fields.len() <= 2);
    }

    #[test]
    fn test_handles_share_registry() {
        let a = RiskMetrics::new();
        let b = a.clone();
        a.observe_prediction_latency(0.001);
        b.observe_prediction_latency(0.002);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("risk-service");
        assert_eq!(logger.service, "risk-service");
    }
}

//! Booking cancellation risk inference
//!
//! This crate provides:
//! - Schema validation of raw booking records
//! - Manifest-driven feature encoding
//! - A single-load model gateway over ONNX or logistic artifacts
//! - Threshold and label policy interpretation
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;

pub use error::{
    ConfigurationError, FailureCause, FailureKind, LoadError, PipelineError, PredictError,
    ValidationError, ValidationReason,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{RiskMetrics, StructuredLogger};
pub use predictor::{
    DecisionInterpreter, FeatureEncoder, GatewayConfig, InterpreterConfig, LabelPolicy,
    LoadedModel, ModelGateway, RequestState, RiskPipeline, DEFAULT_THRESHOLD,
};
pub use schema::{BookingField, FieldSpec, RawBooking, SchemaValidator, ValidatedRecord};

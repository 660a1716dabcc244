//! Request pipeline
//!
//! Drives one booking through validation, encoding, scoring and
//! interpretation. Any failing stage short-circuits to `Failed`, carrying
//! the last state reached.

use super::gateway::{LoadedModel, ModelGateway};
use super::output::{DecisionInterpreter, InterpreterConfig};
use crate::error::{FailureCause, LoadError, PipelineError};
use crate::models::{BookingRecord, FeatureVector, PredictionResult, RawScore};
use crate::observability::{RiskMetrics, StructuredLogger};
use crate::schema::{RawBooking, SchemaValidator, ValidatedRecord};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Lifecycle of a single assessment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    Validated,
    Encoded,
    Scored,
    Interpreted,
    Delivered,
    Failed,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Received => "received",
            RequestState::Validated => "validated",
            RequestState::Encoded => "encoded",
            RequestState::Scored => "scored",
            RequestState::Interpreted => "interpreted",
            RequestState::Delivered => "delivered",
            RequestState::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End-to-end risk assessment over a warmed-up gateway
#[derive(Clone)]
pub struct RiskPipeline {
    validator: SchemaValidator,
    gateway: Arc<ModelGateway>,
    model: Arc<LoadedModel>,
    interpreter: DecisionInterpreter,
    metrics: RiskMetrics,
    logger: StructuredLogger,
}

impl RiskPipeline {
    /// Load the model eagerly and bind the interpreter to it
    pub fn warm_up(gateway: Arc<ModelGateway>, config: &InterpreterConfig) -> Result<Self, LoadError> {
        let metrics = RiskMetrics::new();
        let logger = StructuredLogger::new("risk-pipeline");

        let model = gateway.load().map_err(|e| {
            metrics.inc_model_load_failures();
            logger.log_model_load_failed(&e);
            e
        })?;
        let interpreter = config.resolve(&model)?;

        metrics.set_model_version(model.version(), model.format().as_str());
        logger.log_model_loaded(
            model.version(),
            model.format().as_str(),
            model.encoder().width(),
            model.checksum(),
        );

        Ok(Self {
            validator: SchemaValidator::new(),
            gateway,
            model,
            interpreter,
            metrics,
            logger,
        })
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }

    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    pub fn interpreter(&self) -> &DecisionInterpreter {
        &self.interpreter
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Assess a raw booking mapping synchronously
    pub fn assess(&self, raw: &RawBooking) -> Result<PredictionResult, PipelineError> {
        let start = Instant::now();
        let features = self.validate_and_encode(raw)?;
        let score = self
            .gateway
            .predict(&features)
            .map_err(|e| self.fail(RequestState::Encoded, e.into()))?;
        Ok(self.deliver(score, start))
    }

    /// Assess a typed booking, re-checking it against the schema
    pub fn assess_record(&self, record: &BookingRecord) -> Result<PredictionResult, PipelineError> {
        self.assess(&record.to_raw())
    }

    /// Assess with inference moved to the blocking pool under the gateway's timeout
    pub async fn assess_with_timeout(&self, raw: &RawBooking) -> Result<PredictionResult, PipelineError> {
        let start = Instant::now();
        let features = self.validate_and_encode(raw)?;
        let score = Arc::clone(&self.gateway)
            .predict_with_timeout(features)
            .await
            .map_err(|e| self.fail(RequestState::Encoded, e.into()))?;
        Ok(self.deliver(score, start))
    }

    fn validate_and_encode(&self, raw: &RawBooking) -> Result<FeatureVector, PipelineError> {
        debug!(state = %RequestState::Received, fields = raw.len(), "Assessing booking");
        let record: ValidatedRecord = self
            .validator
            .validate(raw)
            .map_err(|e| self.fail(RequestState::Received, e.into()))?;
        debug!(state = %RequestState::Validated, "Booking validated");

        let features = self.model.encoder().encode(&record);
        debug!(state = %RequestState::Encoded, width = features.len(), "Booking encoded");
        Ok(features)
    }

    fn deliver(&self, score: RawScore, start: Instant) -> PredictionResult {
        debug!(state = %RequestState::Scored, probability = score.probability, "Booking scored");
        let result = self.interpreter.interpret(score, self.model.version());
        debug!(state = %RequestState::Interpreted, label = result.label.as_str(), "Score interpreted");

        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        self.metrics.record_prediction(&result);
        self.logger.log_prediction(&result, elapsed.as_micros() as u64);
        debug!(state = %RequestState::Delivered, "Result delivered");
        result
    }

    fn fail(&self, reached: RequestState, cause: FailureCause) -> PipelineError {
        let error = PipelineError { reached, cause };
        match error.validation() {
            Some(invalid) => {
                self.metrics.record_validation_failure(invalid);
                self.logger.log_validation_failure(invalid);
            }
            None => {
                self.metrics.record_prediction_error(&error);
                self.logger.log_prediction_failure(&error);
            }
        }
        debug!(state = %RequestState::Failed, reached = %reached, "Request failed");
        error
    }
}

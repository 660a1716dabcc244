//! Error taxonomy for the inference pipeline
//!
//! Each component boundary has its own error type so callers can tell
//! "fix your input" apart from "system unavailable" and "unexpected error".

use crate::predictor::RequestState;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A booking field failed validation
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

/// Why a field was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReason {
    Missing,
    WrongType { expected: &'static str },
    NotInDomain { value: String, allowed: &'static [&'static str] },
    OutOfRange { value: f64, min: f64, max: f64 },
    Unexpected,
}

impl ValidationReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationReason::Missing => "missing",
            ValidationReason::WrongType { .. } => "wrong_type",
            ValidationReason::NotInDomain { .. } => "not_in_domain",
            ValidationReason::OutOfRange { .. } => "out_of_range",
            ValidationReason::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::Missing => f.write_str("missing"),
            ValidationReason::WrongType { expected } => write!(f, "expected {}", expected),
            ValidationReason::NotInDomain { value, allowed } => {
                write!(f, "'{}' is not one of [{}]", value, allowed.join(", "))
            }
            ValidationReason::OutOfRange { value, min, max } => {
                write!(f, "{} is outside {}..={}", value, min, max)
            }
            ValidationReason::Unexpected => f.write_str("unexpected field"),
        }
    }
}

/// The artifact and the encoder disagree, or a setting is unusable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("manifest does not encode field `{0}`")]
    MissingField(String),

    #[error("manifest encodes field `{0}` more than once")]
    DuplicateField(String),

    #[error("manifest references unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{field}` cannot use {encoding} encoding")]
    EncodingKind { field: String, encoding: &'static str },

    #[error("categories for `{field}` do not match its domain: {detail}")]
    CategoryMismatch { field: String, detail: String },

    #[error("scaling for `{field}` needs a positive finite standard deviation")]
    InvalidScale { field: String },

    #[error("model expects {expected} input features but the manifest encodes {found}")]
    InputWidth { expected: usize, found: usize },

    #[error("artifact exposes no probability output; a bare label cannot be interpreted")]
    ProbabilityUnavailable,

    #[error("decision threshold {0} must lie strictly between 0 and 1")]
    InvalidThreshold(f64),

    #[error("self-check inference failed: {0}")]
    SelfCheck(String),
}

/// The model artifact could not be brought into service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("model artifact not found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {cause}")]
    Unreadable { path: PathBuf, cause: String },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("artifact at {path} is corrupt or incompatible: {cause}")]
    Corrupt { path: PathBuf, cause: String },

    #[error("model configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// A single prediction could not be produced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("model has not been loaded")]
    NotLoaded,

    #[error("model unavailable: {0}")]
    Unavailable(LoadError),

    #[error("feature vector has {found} values, model expects {expected}")]
    FeatureWidth { expected: usize, found: usize },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced invalid output: {0}")]
    InvalidOutput(String),

    #[error("inference exceeded the {timeout_ms}ms budget")]
    Timeout { timeout_ms: u64 },
}

/// Coarse failure category shown to end users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The caller can fix the request
    InvalidInput,
    /// The service cannot score right now; retrying later may help
    Unavailable,
    Unexpected,
}

/// Underlying cause of a failed request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Predict(#[from] PredictError),
}

/// A request that ended in the terminal `Failed` state
#[derive(Debug, Clone, PartialEq, Error)]
#[error("request failed after reaching {reached}: {cause}")]
pub struct PipelineError {
    /// Last state the request reached before failing
    pub reached: RequestState,
    pub cause: FailureCause,
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match &self.cause {
            FailureCause::Validation(_) => FailureKind::InvalidInput,
            FailureCause::Predict(
                PredictError::NotLoaded | PredictError::Unavailable(_) | PredictError::Timeout { .. },
            ) => FailureKind::Unavailable,
            FailureCause::Predict(_) => FailureKind::Unexpected,
        }
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match &self.cause {
            FailureCause::Validation(err) => Some(err),
            FailureCause::Predict(_) => None,
        }
    }

    /// Human-readable message for the presentation layer
    pub fn user_message(&self) -> String {
        match (&self.cause, self.kind()) {
            (FailureCause::Validation(err), _) => {
                format!("Please fix `{}`: {}", err.field, err.reason)
            }
            (_, FailureKind::Unavailable) => {
                "The cancellation model is unavailable right now; please try again later".to_string()
            }
            _ => "An unexpected error occurred while scoring this booking".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(
            "lead_time",
            ValidationReason::OutOfRange {
                value: 400.0,
                min: 0.0,
                max: 365.0,
            },
        );
        assert_eq!(err.to_string(), "invalid field `lead_time`: 400 is outside 0..=365");
        assert_eq!(err.reason.code(), "out_of_range");
    }

    #[test]
    fn test_failure_kinds() {
        let invalid = PipelineError {
            reached: RequestState::Received,
            cause: ValidationError::new("hotel", ValidationReason::Missing).into(),
        };
        assert_eq!(invalid.kind(), FailureKind::InvalidInput);
        assert!(invalid.user_message().contains("hotel"));

        let timeout = PipelineError {
            reached: RequestState::Encoded,
            cause: PredictError::Timeout { timeout_ms: 50 }.into(),
        };
        assert_eq!(timeout.kind(), FailureKind::Unavailable);

        let broken = PipelineError {
            reached: RequestState::Encoded,
            cause: PredictError::InvalidOutput("NaN".to_string()).into(),
        };
        assert_eq!(broken.kind(), FailureKind::Unexpected);
        assert_ne!(broken.user_message(), timeout.user_message());
    }

    #[test]
    fn test_configuration_error_converts_to_load_error() {
        let err: LoadError = ConfigurationError::ProbabilityUnavailable.into();
        assert!(matches!(
            err,
            LoadError::Configuration(ConfigurationError::ProbabilityUnavailable)
        ));
    }
}

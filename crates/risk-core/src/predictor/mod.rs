//! Cancellation risk prediction engine

mod features;
mod gateway;
mod inference;
mod manifest;
mod output;
mod pipeline;

pub use features::FeatureEncoder;
pub use gateway::{
    GatewayConfig, InferenceStats, LoadedModel, ModelGateway, DEFAULT_INFERENCE_TIMEOUT,
    MAX_INFERENCE_MS,
};
pub use inference::{LogisticClassifier, OnnxClassifier};
pub use manifest::{
    compute_checksum, ArtifactFormat, ArtifactSpec, Encoding, FeatureSpec, ModelManifest,
    OutputSpec, Standardization,
};
pub use output::{DecisionInterpreter, InterpreterConfig, LabelPolicy, DEFAULT_THRESHOLD};
pub use pipeline::{RequestState, RiskPipeline};

use crate::error::PredictError;
use crate::models::RawScore;

/// A loaded classifier that scores encoded feature vectors
pub trait Classifier: Send + Sync {
    /// Score one encoded booking
    fn score(&self, features: &[f32]) -> Result<RawScore, PredictError>;

    /// Number of input features the classifier expects
    fn input_width(&self) -> usize;

    fn format(&self) -> ArtifactFormat;
}

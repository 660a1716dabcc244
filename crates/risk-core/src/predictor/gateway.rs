//! Model gateway
//!
//! Owns the trained artifact. Loading happens at most once per gateway: the
//! first caller of [`ModelGateway::load`] reads the manifest, verifies the
//! artifact checksum, builds the classifier and runs a self-check inference.
//! The outcome, success or failure, is memoized for the process lifetime.

use super::features::FeatureEncoder;
use super::inference::{LogisticClassifier, OnnxClassifier};
use super::manifest::{compute_checksum, ArtifactFormat, ModelManifest};
use super::Classifier;
use crate::error::{ConfigurationError, LoadError, PredictError};
use crate::models::{FeatureVector, RawScore};
use crate::schema::reference_record;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Inferences slower than this are counted and logged
pub const MAX_INFERENCE_MS: u128 = 5;

/// Default budget for a single inference call
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_millis(250);

/// Where the gateway finds its artifact and how long inference may take
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub manifest_path: PathBuf,
    pub inference_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            inference_timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }
}

/// A verified, ready-to-serve model together with its feature layout
pub struct LoadedModel {
    manifest: ModelManifest,
    encoder: FeatureEncoder,
    classifier: Box<dyn Classifier>,
    checksum: String,
}

impl LoadedModel {
    /// Bind a classifier to its manifest, checking that they agree
    ///
    /// Builds the encoder from the manifest, compares its width with the
    /// classifier's input width, and scores a reference booking once.
    pub fn new(
        manifest: ModelManifest,
        classifier: Box<dyn Classifier>,
        checksum: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let encoder = FeatureEncoder::from_manifest(&manifest.features)?;
        if classifier.input_width() != encoder.width() {
            return Err(ConfigurationError::InputWidth {
                expected: classifier.input_width(),
                found: encoder.width(),
            });
        }

        let probe = encoder.encode(&reference_record());
        let score = classifier
            .score(probe.as_slice())
            .map_err(|e| ConfigurationError::SelfCheck(e.to_string()))?;
        check_probability(&score).map_err(|e| ConfigurationError::SelfCheck(e.to_string()))?;

        Ok(Self {
            manifest,
            encoder,
            classifier,
            checksum: checksum.into(),
        })
    }

    pub fn version(&self) -> &str {
        &self.manifest.model_version
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn format(&self) -> ArtifactFormat {
        self.classifier.format()
    }

    /// SHA-256 of the artifact file as loaded
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Whether the artifact produces its own discrete label
    pub fn emits_label(&self) -> bool {
        self.format() == ArtifactFormat::Onnx && self.manifest.outputs.label.is_some()
    }

    /// Threshold chosen at training time, if the manifest pins one
    pub fn recommended_threshold(&self) -> Option<f64> {
        self.manifest.decision_threshold
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("version", &self.version())
            .field("format", &self.format())
            .field("width", &self.encoder.width())
            .field("checksum", &self.checksum)
            .finish()
    }
}

/// Inference statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// Single owner of the loaded model, shared by all concurrent requests
pub struct ModelGateway {
    config: GatewayConfig,
    model: OnceLock<Result<Arc<LoadedModel>, LoadError>>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl ModelGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            model: OnceLock::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    /// Gateway serving an already loaded model
    pub fn from_loaded(model: LoadedModel, config: GatewayConfig) -> Self {
        let gateway = Self::new(config);
        let _ = gateway.model.set(Ok(Arc::new(model)));
        gateway
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Load the artifact, or return the memoized outcome of the first load
    pub fn load(&self) -> Result<Arc<LoadedModel>, LoadError> {
        self.model
            .get_or_init(|| {
                let path = &self.config.manifest_path;
                match load_artifact(path) {
                    Ok(model) => {
                        info!(
                            path = %path.display(),
                            model_version = %model.version(),
                            format = model.format().as_str(),
                            features = model.encoder().width(),
                            "Model artifact loaded"
                        );
                        Ok(Arc::new(model))
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Model artifact failed to load");
                        Err(e)
                    }
                }
            })
            .clone()
    }

    /// The loaded model, if loading has completed successfully
    pub fn model(&self) -> Option<Arc<LoadedModel>> {
        self.model.get().and_then(|r| r.as_ref().ok()).cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.model().is_some()
    }

    /// Score an encoded booking with the loaded model
    ///
    /// Never triggers a load: before [`load`](Self::load) this reports
    /// `NotLoaded`, and after a failed load it reports `Unavailable`.
    pub fn predict(&self, features: &FeatureVector) -> Result<RawScore, PredictError> {
        let model = match self.model.get() {
            None => return Err(PredictError::NotLoaded),
            Some(Err(e)) => return Err(PredictError::Unavailable(e.clone())),
            Some(Ok(model)) => model,
        };

        let expected = model.encoder.width();
        if features.len() != expected {
            return Err(PredictError::FeatureWidth {
                expected,
                found: features.len(),
            });
        }

        let start = Instant::now();
        let score = model.classifier.score(features.as_slice())?;
        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        check_probability(&score)?;
        Ok(score)
    }

    /// Score on the blocking pool, giving up after the configured timeout
    pub async fn predict_with_timeout(
        self: Arc<Self>,
        features: FeatureVector,
    ) -> Result<RawScore, PredictError> {
        let timeout = self.config.inference_timeout;
        let gateway = Arc::clone(&self);
        let task = tokio::task::spawn_blocking(move || gateway.predict(&features));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PredictError::Inference(format!("inference task failed: {}", e))),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Inference timed out");
                Err(PredictError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

fn check_probability(score: &RawScore) -> Result<(), PredictError> {
    if score.probability.is_finite() && (0.0..=1.0).contains(&score.probability) {
        Ok(())
    } else {
        Err(PredictError::InvalidOutput(format!(
            "probability {} is not in [0, 1]",
            score.probability
        )))
    }
}

fn load_artifact(manifest_path: &Path) -> Result<LoadedModel, LoadError> {
    let manifest = ModelManifest::from_path(manifest_path)?;
    let artifact = manifest.artifact_path(manifest_path);

    if manifest.model.format == ArtifactFormat::Onnx && manifest.outputs.probability.is_none() {
        return Err(ConfigurationError::ProbabilityUnavailable.into());
    }

    if !artifact.exists() {
        return Err(LoadError::NotFound { path: artifact });
    }
    let bytes = fs::read(&artifact).map_err(|e| LoadError::Unreadable {
        path: artifact.clone(),
        cause: e.to_string(),
    })?;

    let checksum = compute_checksum(&bytes);
    if let Some(expected) = &manifest.model.sha256 {
        if !expected.eq_ignore_ascii_case(&checksum) {
            return Err(LoadError::ChecksumMismatch {
                path: artifact,
                expected: expected.clone(),
                actual: checksum,
            });
        }
    }

    let classifier: Box<dyn Classifier> = match manifest.model.format {
        ArtifactFormat::Logistic => Box::new(LogisticClassifier::from_bytes(&bytes, &artifact)?),
        ArtifactFormat::Onnx => Box::new(OnnxClassifier::from_bytes(
            &bytes,
            manifest.encoded_width(),
            &manifest.outputs,
            &artifact,
        )?),
    };

    Ok(LoadedModel::new(manifest, classifier, checksum)?)
}

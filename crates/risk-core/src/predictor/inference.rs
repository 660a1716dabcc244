//! Classifier backends
//!
//! Two artifact formats are supported: ONNX graphs run through tract, and a
//! plain JSON logistic regression used for lightweight deployments and tests.

use super::manifest::{ArtifactFormat, OutputSpec};
use super::Classifier;
use crate::error::{ConfigurationError, LoadError, PredictError};
use crate::models::RawScore;
use serde::Deserialize;
use std::path::Path;
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::infer::Factoid;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Logistic regression over the encoded features
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogisticClassifier {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LogisticClassifier {
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    /// Parse `{"intercept": .., "coefficients": [..]}`
    pub fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self, LoadError> {
        let model: Self = serde_json::from_slice(bytes).map_err(|e| LoadError::Corrupt {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        if !model.intercept.is_finite() || model.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(LoadError::Corrupt {
                path: path.to_path_buf(),
                cause: "non-finite weight".to_string(),
            });
        }
        Ok(model)
    }
}

impl Classifier for LogisticClassifier {
    fn score(&self, features: &[f32]) -> Result<RawScore, PredictError> {
        if features.len() != self.coefficients.len() {
            return Err(PredictError::FeatureWidth {
                expected: self.coefficients.len(),
                found: features.len(),
            });
        }
        let logit = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * f64::from(*x))
                .sum::<f64>();
        Ok(RawScore {
            label: None,
            probability: 1.0 / (1.0 + (-logit).exp()),
        })
    }

    fn input_width(&self) -> usize {
        self.coefficients.len()
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Logistic
    }
}

/// ONNX classifier executed with tract
pub struct OnnxClassifier {
    model: TractModel,
    width: usize,
    outputs: OutputSpec,
}

impl OnnxClassifier {
    /// Load and optimize an ONNX model for a `[1, width]` f32 input
    pub fn from_bytes(
        bytes: &[u8],
        width: usize,
        outputs: &OutputSpec,
        path: &Path,
    ) -> Result<Self, LoadError> {
        let corrupt = |e: TractError| LoadError::Corrupt {
            path: path.to_path_buf(),
            cause: e.to_string(),
        };

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(corrupt)?;

        if let Some(declared) = declared_width(&model) {
            if declared != width {
                return Err(ConfigurationError::InputWidth {
                    expected: declared,
                    found: width,
                }
                .into());
            }
        }

        let model = model
            .with_input_fact(0, f32::fact([1, width]).into())
            .map_err(corrupt)?
            .into_optimized()
            .map_err(corrupt)?
            .into_runnable()
            .map_err(corrupt)?;

        let available = model.model().output_outlets().map_err(corrupt)?.len();
        let wanted = outputs.label.into_iter().chain(outputs.probability);
        if let Some(index) = wanted.into_iter().find(|i| *i >= available) {
            return Err(LoadError::Corrupt {
                path: path.to_path_buf(),
                cause: format!("model has {} outputs, manifest names output {}", available, index),
            });
        }

        Ok(Self {
            model,
            width,
            outputs: outputs.clone(),
        })
    }

    fn probability(&self, output: &Tensor) -> Result<f64, PredictError> {
        let values = output
            .cast_to::<f32>()
            .map_err(|e| PredictError::InvalidOutput(e.to_string()))?;
        let values = values
            .as_slice::<f32>()
            .map_err(|e| PredictError::InvalidOutput(e.to_string()))?;

        // A single value is the positive class probability; otherwise one column per class.
        let value = match values {
            [p] => Some(*p),
            _ => values.get(self.outputs.positive_class).copied(),
        };
        value.map(f64::from).ok_or_else(|| {
            PredictError::InvalidOutput(format!(
                "probability output has {} columns, positive class is {}",
                values.len(),
                self.outputs.positive_class
            ))
        })
    }

    fn label(&self, output: &Tensor) -> Result<bool, PredictError> {
        let labels = output
            .cast_to::<i64>()
            .map_err(|e| PredictError::InvalidOutput(e.to_string()))?;
        let labels = labels
            .as_slice::<i64>()
            .map_err(|e| PredictError::InvalidOutput(e.to_string()))?;
        labels
            .first()
            .map(|l| *l == self.outputs.positive_class as i64)
            .ok_or_else(|| PredictError::InvalidOutput("empty label output".to_string()))
    }
}

impl Classifier for OnnxClassifier {
    fn score(&self, features: &[f32]) -> Result<RawScore, PredictError> {
        if features.len() != self.width {
            return Err(PredictError::FeatureWidth {
                expected: self.width,
                found: features.len(),
            });
        }

        let input = Tensor::from_shape(&[1, self.width], features)
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictError::Inference(e.to_string()))?;

        let output = |index: usize| {
            result
                .get(index)
                .ok_or_else(|| PredictError::InvalidOutput(format!("missing output {}", index)))
        };

        let probability = match self.outputs.probability {
            Some(index) => self.probability(output(index)?)?,
            None => return Err(PredictError::InvalidOutput("no probability output".to_string())),
        };
        let label = match self.outputs.label {
            Some(index) => Some(self.label(output(index)?)?),
            None => None,
        };

        Ok(RawScore { label, probability })
    }

    fn input_width(&self) -> usize {
        self.width
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Onnx
    }
}

/// Feature width the graph declares for its first input, when fixed
fn declared_width(model: &InferenceModel) -> Option<usize> {
    let fact = model.input_fact(0).ok()?;
    let dims = fact.shape.concretize()?;
    let last = dims.last()?.to_i64().ok()?;
    usize::try_from(last).ok()
}

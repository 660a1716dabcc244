//! Encoding manifest bundled with a model artifact
//!
//! The manifest pins everything fixed at training time: the artifact format
//! and checksum, the model's output layout, and the exact ordered feature
//! encoding. The encoder is built from it and never guesses a scheme.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized classifier formats the gateway can load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// ONNX graph run with tract
    Onnx,
    /// JSON logistic regression `{intercept, coefficients}`
    Logistic,
}

impl ArtifactFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Onnx => "onnx",
            ArtifactFormat::Logistic => "logistic",
        }
    }
}

/// Location and integrity of the serialized classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub format: ArtifactFormat,
    /// Path relative to the manifest's directory
    pub file: String,
    /// Lowercase hex SHA-256 of the file; verified when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Which model outputs carry the label and the class probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub label: Option<usize>,
    #[serde(default)]
    pub probability: Option<usize>,
    /// Column of the probability output holding the cancelled class
    #[serde(default = "default_positive_class")]
    pub positive_class: usize,
}

fn default_positive_class() -> usize {
    1
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            label: None,
            probability: Some(0),
            positive_class: default_positive_class(),
        }
    }
}

/// Standard scaling applied to a numeric feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standardization {
    pub mean: f64,
    pub std: f64,
}

/// Encoding of one record field into model input columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Encoding {
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<Standardization>,
    },
    OneHot {
        categories: Vec<String>,
    },
    Ordinal {
        categories: Vec<String>,
    },
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Numeric { .. } => "numeric",
            Encoding::OneHot { .. } => "one_hot",
            Encoding::Ordinal { .. } => "ordinal",
        }
    }

    /// Number of input columns this encoding produces
    pub fn width(&self) -> usize {
        match self {
            Encoding::OneHot { categories } => categories.len(),
            Encoding::Numeric { .. } | Encoding::Ordinal { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub field: String,
    pub encoding: Encoding,
}

/// Training-time contract of a model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub model_version: String,
    pub model: ArtifactSpec,
    #[serde(default)]
    pub outputs: OutputSpec,
    /// Features in model input order
    pub features: Vec<FeatureSpec>,
    /// Threshold chosen at training time, used unless overridden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_threshold: Option<f64>,
}

impl ModelManifest {
    /// Read and parse a manifest file
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| LoadError::Unreadable {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| LoadError::Corrupt {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })
    }

    /// Resolve the artifact file relative to the manifest location
    pub fn artifact_path(&self, manifest_path: &Path) -> PathBuf {
        manifest_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.model.file)
    }

    /// Total encoded width declared by the feature list
    pub fn encoded_width(&self) -> usize {
        self.features.iter().map(|f| f.encoding.width()).sum()
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"booking model");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"booking model"));
        assert_ne!(checksum, compute_checksum(b"booking model v2"));
    }

    #[test]
    fn test_parse_manifest_with_defaults() {
        let json = r#"{
            "model_version": "v1",
            "model": {"format": "logistic", "file": "model.json"},
            "features": [
                {"field": "lead_time", "encoding": {"kind": "numeric", "scale": {"mean": 100.0, "std": 50.0}}},
                {"field": "hotel", "encoding": {"kind": "one_hot", "categories": ["City Hotel", "Resort Hotel"]}},
                {"field": "lead_time_category", "encoding": {"kind": "ordinal", "categories": ["last_minute", "short", "medium", "long"]}}
            ]
        }"#;
        let manifest: ModelManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.model.format, ArtifactFormat::Logistic);
        assert_eq!(manifest.outputs.probability, Some(0));
        assert_eq!(manifest.outputs.positive_class, 1);
        assert_eq!(manifest.encoded_width(), 4);
        assert!(manifest.decision_threshold.is_none());
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = ModelManifest::from_path(&temp_dir.path().join("manifest.json")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_garbage_manifest_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ModelManifest::from_path(&path).unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { .. }));
    }

    #[test]
    fn test_artifact_path_is_relative_to_manifest() {
        let manifest = ModelManifest {
            model_version: "v1".to_string(),
            model: ArtifactSpec {
                format: ArtifactFormat::Onnx,
                file: "model.onnx".to_string(),
                sha256: None,
            },
            outputs: OutputSpec::default(),
            features: Vec::new(),
            decision_threshold: None,
        };
        let path = manifest.artifact_path(Path::new("/srv/models/booking/manifest.json"));
        assert_eq!(path, PathBuf::from("/srv/models/booking/model.onnx"));
    }
}

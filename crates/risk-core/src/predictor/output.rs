//! Decision interpretation
//!
//! Turns a raw classifier score into the user-facing result: clamped
//! probability, its complement, and the binary label chosen by the active
//! policy.

use super::gateway::LoadedModel;
use crate::error::ConfigurationError;
use crate::models::{ActivePolicy, CancellationLabel, PredictionResult, RawScore};
use serde::{Deserialize, Serialize};

/// Threshold used when neither configuration nor the manifest sets one
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// How the binary label is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Use the model's own label when it emits one, else the threshold
    #[default]
    Auto,
    /// Always label by `probability >= threshold`
    Threshold,
}

impl LabelPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelPolicy::Auto => "auto",
            LabelPolicy::Threshold => "threshold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(LabelPolicy::Auto),
            "threshold" => Some(LabelPolicy::Threshold),
            _ => None,
        }
    }
}

/// Interpreter settings before they are bound to a loaded model
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InterpreterConfig {
    /// Overrides the manifest's threshold when set
    pub threshold: Option<f64>,
    pub policy: LabelPolicy,
}

impl InterpreterConfig {
    /// Pick the threshold (configuration, then manifest, then default) and validate it
    pub fn resolve(&self, model: &LoadedModel) -> Result<DecisionInterpreter, ConfigurationError> {
        let threshold = self
            .threshold
            .or(model.recommended_threshold())
            .unwrap_or(DEFAULT_THRESHOLD);
        DecisionInterpreter::new(threshold, self.policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInterpreter {
    threshold: f64,
    policy: LabelPolicy,
}

impl DecisionInterpreter {
    pub fn new(threshold: f64, policy: LabelPolicy) -> Result<Self, ConfigurationError> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigurationError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold, policy })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn policy(&self) -> LabelPolicy {
        self.policy
    }

    /// Which rule will label this score
    pub fn active_policy(&self, score: &RawScore) -> ActivePolicy {
        match (self.policy, score.label) {
            (LabelPolicy::Auto, Some(_)) => ActivePolicy::ModelLabel,
            _ => ActivePolicy::Threshold,
        }
    }

    pub fn interpret(&self, score: RawScore, model_version: &str) -> PredictionResult {
        let probability = score.probability.clamp(0.0, 1.0);
        let policy = self.active_policy(&score);
        let cancelled = match (policy, score.label) {
            (ActivePolicy::ModelLabel, Some(label)) => label,
            _ => probability >= self.threshold,
        };

        PredictionResult {
            probability,
            complement: 1.0 - probability,
            label: CancellationLabel::from_cancelled(cancelled),
            policy,
            threshold: self.threshold,
            model_version: model_version.to_string(),
            generated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

//! Service configuration
//!
//! Values come from an optional `risk-service.toml` and `RISK_`-prefixed
//! environment variables, environment winning. Every key has a default.

use anyhow::{Context, Result};
use risk_core::{GatewayConfig, InterpreterConfig, LabelPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "risk-service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Path to the artifact's `manifest.json`
    pub manifest_path: PathBuf,

    /// Overrides the manifest's decision threshold
    pub threshold: Option<f64>,

    pub label_policy: LabelPolicy,

    pub api_port: u16,

    pub inference_timeout_ms: u64,

    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("models/booking-cancellation/manifest.json"),
            threshold: None,
            label_policy: LabelPolicy::Auto,
            api_port: 8080,
            inference_timeout_ms: 250,
            log_format: LogFormat::Json,
        }
    }
}

impl ServiceConfig {
    /// Load from `risk-service.toml` in the working directory (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::build(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
    }

    /// Load from an explicit config file, which must exist, and the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(config::File::from(path).required(true))
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("RISK").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid service configuration")
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(&self.manifest_path)
            .with_timeout(Duration::from_millis(self.inference_timeout_ms))
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            threshold: self.threshold,
            policy: self.label_policy,
        }
    }
}

//! Model artifact inspection

use anyhow::{Context, Result};
use colored::Colorize;
use risk_core::{GatewayConfig, LoadedModel, ModelGateway, DEFAULT_THRESHOLD};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_info, print_json, print_success, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "Column")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: String,
}

#[derive(Serialize)]
struct ModelSummary<'a> {
    model_version: &'a str,
    format: &'a str,
    checksum: &'a str,
    threshold: f64,
    features: &'a [String],
}

fn summary(model: &LoadedModel) -> ModelSummary<'_> {
    ModelSummary {
        model_version: model.version(),
        format: model.format().as_str(),
        checksum: model.checksum(),
        threshold: model.recommended_threshold().unwrap_or(DEFAULT_THRESHOLD),
        features: model.encoder().feature_names(),
    }
}

/// Load an artifact and show its summary and feature layout
pub fn show_model(manifest: &Path, format: OutputFormat) -> Result<()> {
    let gateway = ModelGateway::new(GatewayConfig::new(manifest));
    let model = gateway
        .load()
        .with_context(|| format!("Failed to load model from {}", manifest.display()))?;
    let summary = summary(&model);

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            print_success(&format!("Model {} loaded and self-checked", summary.model_version.cyan()));
            println!("Format:     {}", summary.format);
            println!("Checksum:   {}", summary.checksum);
            println!("Threshold:  {:.2}", summary.threshold);
            println!();
            let rows: Vec<FeatureRow> = summary
                .features
                .iter()
                .enumerate()
                .map(|(index, name)| FeatureRow {
                    index,
                    name: name.clone(),
                })
                .collect();
            print_table(&rows, format);
        }
    }
    Ok(())
}

/// Show the model a running service is serving
pub async fn show_remote_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let model = client.model().await?;
    match format {
        OutputFormat::Json => print_json(&model),
        OutputFormat::Table => {
            print_info(&format!("Service is serving model {}", model.model_version.cyan()));
            println!("Format:     {}", model.format);
            println!("Checksum:   {}", model.checksum);
            println!("Features:   {}", model.feature_count);
            println!("Policy:     {}", model.policy);
            println!("Threshold:  {:.2}", model.threshold);
        }
    }
    Ok(())
}

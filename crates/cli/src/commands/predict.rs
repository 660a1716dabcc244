//! Booking scoring commands

use anyhow::{bail, Context, Result};
use colored::Colorize;
use risk_core::{
    GatewayConfig, InterpreterConfig, LabelPolicy, ModelGateway, PredictionResult, RawBooking,
    RiskPipeline,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_label, color_probability, format_probability, print_error, print_json, print_table,
    print_warning, OutputFormat,
};

#[derive(Tabled, Serialize)]
struct PredictionRow {
    #[tabled(rename = "Cancel")]
    probability: String,
    #[tabled(rename = "Keep")]
    complement: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Policy")]
    policy: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Verdict")]
    summary: String,
}

impl PredictionRow {
    fn new(result: &PredictionResult) -> Self {
        Self {
            probability: color_probability(result.probability, result.threshold),
            complement: format_probability(result.complement),
            label: color_label(result.label),
            policy: result.policy.as_str().to_string(),
            threshold: format!("{:.2}", result.threshold),
            summary: result.label.summary().to_string(),
        }
    }
}

/// Read one booking object from a JSON file, or stdin for `-`
pub fn read_booking(input: &Path) -> Result<RawBooking> {
    let content = if input == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read booking from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    match serde_json::from_str(&content).context("Input is not valid JSON")? {
        Value::Object(booking) => Ok(booking),
        Value::Array(_) => bail!("Input holds several bookings; score one booking per run"),
        _ => bail!("Input must be a single booking JSON object"),
    }
}

fn print_result(result: &PredictionResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            print_table(&[PredictionRow::new(result)], format);
            println!("Model: {}", result.model_version.cyan());
        }
    }
}

/// Score a booking locally against a model artifact
pub fn predict_local(
    manifest: &Path,
    input: &Path,
    threshold: Option<f64>,
    policy: LabelPolicy,
    format: OutputFormat,
) -> Result<()> {
    let booking = read_booking(input)?;
    let gateway = Arc::new(ModelGateway::new(GatewayConfig::new(manifest)));
    let pipeline = RiskPipeline::warm_up(gateway, &InterpreterConfig { threshold, policy })
        .context("Failed to load model artifact")?;

    match pipeline.assess(&booking) {
        Ok(result) => {
            print_result(&result, format);
            Ok(())
        }
        Err(e) => {
            report_rejection(&pipeline, &booking, &e.user_message());
            bail!("Booking could not be scored")
        }
    }
}

fn report_rejection(pipeline: &RiskPipeline, raw: &RawBooking, message: &str) {
    print_error(message);
    let violations = pipeline.validator().collect_violations(raw);
    for violation in violations.iter().skip(1) {
        print_warning(&format!("  also: {}", violation));
    }
}

/// Score a booking through a running risk service
pub async fn predict_remote(client: &ApiClient, input: &Path, format: OutputFormat) -> Result<()> {
    let booking = Value::Object(read_booking(input)?);
    let prediction = client
        .predict(&booking)
        .await
        .context("Booking was not scored")?;
    print_result(&prediction.result, format);
    Ok(())
}

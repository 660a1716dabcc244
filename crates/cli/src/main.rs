//! Hotel Cancellation Risk CLI
//!
//! Scores a booking locally against a model artifact or through a running
//! risk service, and inspects artifacts and the booking schema.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{model, predict, schema};
use risk_core::LabelPolicy;
use std::path::PathBuf;

const DEFAULT_MANIFEST: &str = "models/booking-cancellation/manifest.json";

/// Hotel Cancellation Risk CLI
#[derive(Parser)]
#[command(name = "hcr")]
#[command(author, version, about = "CLI for Hotel Cancellation Risk scoring", long_about = None)]
pub struct Cli {
    /// Risk service URL (can also be set via HCR_API_URL env var)
    #[arg(long, env = "HCR_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a booking locally with a model artifact
    Predict {
        /// Path to the artifact's manifest.json
        #[arg(long, env = "RISK_MANIFEST_PATH", default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,

        /// JSON file with a single booking object ("-" for stdin)
        #[arg(long, short)]
        input: PathBuf,

        /// Decision threshold in (0, 1); overrides the manifest's
        #[arg(long)]
        threshold: Option<f64>,

        /// Label policy: auto or threshold
        #[arg(long, default_value = "auto", value_parser = parse_policy)]
        policy: LabelPolicy,
    },

    /// Score a booking through a running risk service
    Remote {
        /// JSON file with a single booking object ("-" for stdin)
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Show a model artifact's summary and feature layout
    Model {
        /// Path to the artifact's manifest.json
        #[arg(long, env = "RISK_MANIFEST_PATH", default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,

        /// Ask the running service instead of loading the artifact
        #[arg(long)]
        remote: bool,
    },

    /// List booking fields and their accepted values
    Schema,
}

fn parse_policy(value: &str) -> std::result::Result<LabelPolicy, String> {
    LabelPolicy::parse(value).ok_or_else(|| format!("unknown policy '{}' (auto, threshold)", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            manifest,
            input,
            threshold,
            policy,
        } => {
            predict::predict_local(&manifest, &input, threshold, policy, cli.format)?;
        }
        Commands::Remote { input } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            predict::predict_remote(&client, &input, cli.format).await?;
        }
        Commands::Model { manifest, remote } => {
            if remote {
                let client = client::ApiClient::new(&cli.api_url)?;
                model::show_remote_model(&client, cli.format).await?;
            } else {
                model::show_model(&manifest, cli.format)?;
            }
        }
        Commands::Schema => schema::show_schema(cli.format)?,
    }

    Ok(())
}

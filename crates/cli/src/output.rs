//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use risk_core::CancellationLabel;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or as a JSON array
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Probability as a percentage with two decimals
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

pub fn color_label(label: CancellationLabel) -> String {
    match label {
        CancellationLabel::Cancelled => label.as_str().red().bold().to_string(),
        CancellationLabel::NotCancelled => label.as_str().green().to_string(),
    }
}

/// Color a cancellation probability by how far it sits from the threshold
pub fn color_probability(probability: f64, threshold: f64) -> String {
    let formatted = format_probability(probability);
    if probability >= threshold {
        formatted.red().to_string()
    } else if probability >= threshold * 0.75 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

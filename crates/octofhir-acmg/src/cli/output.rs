//! Output formatting utilities

use anyhow::{Context, Result};
use colored::Colorize;
use octofhir_acmg_diagnostics::{Diagnostic, Severity};
use octofhir_acmg_eval::PhenotypeSummary;
use serde::Serialize;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use tabled::{Table, Tabled, settings::Style};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    JsonPretty,
    Table,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "json" => Self::Json,
            "table" => Self::Table,
            _ => Self::JsonPretty,
        }
    }
}

/// Set up color output based on user preference
pub fn setup_colors(mode: &str) {
    match mode.to_lowercase().as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::set_override(io::stderr().is_terminal()),
    }
}

pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Print a diagnostic to stderr; informational ones only when verbose
pub fn print_diagnostic(diagnostic: &Diagnostic, verbose: bool) {
    if matches!(diagnostic.severity, Severity::Info | Severity::Hint) && !verbose {
        return;
    }
    eprintln!("{}", diagnostic.render_colored());
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write to output file: {}", path.display()))?;
        eprintln!("{}", format_success(&format!("Output written to {}", path.display())));
    } else {
        println!("{content}");
    }
    Ok(())
}

pub fn format_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).context("Failed to serialize JSON")
    } else {
        serde_json::to_string(value).context("Failed to serialize JSON")
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Gene")]
    gene: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Phenotype")]
    phenotype: String,
    #[tabled(rename = "Classification")]
    classification: String,
    #[tabled(rename = "Met criteria")]
    met: String,
}

/// One row per phenotype entry
pub fn summary_table(rows: &[PhenotypeSummary]) -> String {
    if rows.is_empty() {
        return "(no phenotypes)".to_string();
    }
    let rows = rows.iter().map(|row| SummaryRow {
        gene: row.gene.clone(),
        source: row.source.to_string(),
        phenotype: row.phenotype.clone(),
        classification: row
            .classification
            .map_or_else(|| "-".to_string(), |c| c.abbreviation().to_string()),
        met: row.met.join(", "),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

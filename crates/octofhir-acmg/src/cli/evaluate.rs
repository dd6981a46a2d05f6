//! Evaluate command implementation

use super::{load_config, load_rules, output};
use crate::{EvaluationSession, InMemoryHistoryStore, SessionReport, VariantRecord};
use anyhow::{Context, Result};
use octofhir_acmg_model::{HistoryStore, NoOpHistoryStore};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for evaluate command
pub struct EvaluateConfig {
    pub record: PathBuf,
    pub rules: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub history: Option<PathBuf>,
    /// Emit the full session report instead of the enriched record
    pub report: bool,
    pub verbose: bool,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Parse a record file: one record object, or an array of records
pub fn parse_records(text: &str) -> Result<(Vec<VariantRecord>, bool)> {
    let json: serde_json::Value = serde_json::from_str(text).context("Record file is not valid JSON")?;
    match json {
        serde_json::Value::Array(items) => {
            let records = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    serde_json::from_value(item).with_context(|| format!("Invalid record at index {index}"))
                })
                .collect::<Result<Vec<VariantRecord>>>()?;
            Ok((records, true))
        }
        other => {
            let record = serde_json::from_value(other).context("Invalid record")?;
            Ok((vec![record], false))
        }
    }
}

pub fn build_session(config: &EvaluateConfig) -> Result<EvaluationSession> {
    let rules = load_rules(config.rules.as_deref())?;
    let engine_config = load_config(config.config.as_deref())?;

    let store: Arc<dyn HistoryStore> = match &config.history {
        Some(path) => {
            let store = InMemoryHistoryStore::from_path(path)
                .with_context(|| format!("Failed to load history: {}", path.display()))?;
            log::info!("loaded {} history documents from {}", store.len(), path.display());
            Arc::new(store)
        }
        None => Arc::new(NoOpHistoryStore),
    };

    EvaluationSession::new(Arc::new(rules), Arc::new(engine_config), store)
        .context("Configuration does not match the rule set")
}

/// Evaluate one or more variant records
pub async fn evaluate(config: EvaluateConfig) -> Result<()> {
    let text = fs::read_to_string(&config.record)
        .with_context(|| format!("Failed to read record file: {}", config.record.display()))?;
    let (records, batch) = parse_records(&text)?;
    let session = build_session(&config)?;

    if config.verbose {
        eprintln!(
            "Evaluating {} record(s) against {} criteria",
            records.len(),
            session.rules().len()
        );
        for diagnostic in session.rules().lint() {
            output::print_diagnostic(&diagnostic, true);
        }
    }

    let mut reports = Vec::new();
    let mut failed = 0usize;
    for result in session.evaluate_all(records).await {
        match result {
            Ok(report) => {
                for diagnostic in &report.diagnostics {
                    output::print_diagnostic(diagnostic, config.verbose);
                }
                reports.push(report);
            }
            Err(err) => {
                failed += 1;
                for diagnostic in err.to_diagnostics() {
                    output::print_diagnostic(&diagnostic, true);
                }
            }
        }
    }

    let format = output::OutputFormat::from_name(config.output_format.as_deref().unwrap_or("pretty"));
    let content = render(&reports, batch, config.report, format)?;
    output::write_output(&content, config.output_file.as_deref())?;

    if failed > 0 {
        anyhow::bail!("{failed} record(s) could not be evaluated");
    }
    Ok(())
}

fn render(reports: &[SessionReport], batch: bool, full: bool, format: output::OutputFormat) -> Result<String> {
    let pretty = format == output::OutputFormat::JsonPretty;
    match format {
        output::OutputFormat::Table => {
            let rows: Vec<_> = reports.iter().flat_map(SessionReport::summary).collect();
            Ok(output::summary_table(&rows))
        }
        _ if full && batch => output::format_json(reports, pretty),
        _ if full => match reports.first() {
            Some(report) => output::format_json(report, pretty),
            None => Ok("null".to_string()),
        },
        _ => {
            let records: Vec<&VariantRecord> = reports.iter().map(|r| &r.record).collect();
            match (batch, records.first()) {
                (false, Some(record)) => output::format_json(record, pretty),
                (false, None) => Ok("null".to_string()),
                (true, _) => output::format_json(&records, pretty),
            }
        }
    }
}

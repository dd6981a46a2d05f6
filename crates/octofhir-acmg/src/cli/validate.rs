//! Validate command implementation

use super::{load_config, output};
use crate::{EngineConfig, RuleSet, STANDARD_RULES};
use anyhow::Result;
use colored::Colorize;
use octofhir_acmg_diagnostics::Diagnostic;
use std::fs;
use std::path::PathBuf;

/// Configuration for validate command
pub struct ValidateConfig {
    /// Rule-set files; the bundled rules are checked when empty
    pub files: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub strict: bool,
    pub verbose: bool,
}

/// Validation result for a single rule set
pub struct ValidationResult {
    pub name: String,
    pub criteria: usize,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Load a rule set from text, lint it, and check it against the configuration
pub fn validate_text(name: &str, text: &str, config: Option<&EngineConfig>) -> ValidationResult {
    let mut result = ValidationResult {
        name: name.to_string(),
        criteria: 0,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let rules = match RuleSet::from_yaml_str(text) {
        Ok(rules) => rules,
        Err(err) => {
            result.errors = err.to_diagnostics();
            return result;
        }
    };
    result.criteria = rules.len();
    result.warnings = rules.lint();

    if rules.is_empty() {
        result.warnings.push(Diagnostic::warning(
            octofhir_acmg_diagnostics::ACMG0100,
            "rule set defines no criteria",
        ));
    }
    if let Some(config) = config {
        if let Err(err) = config.validate(&rules) {
            result.errors.extend(err.to_diagnostics());
        }
    }
    result
}

/// Validate rule-set files
pub async fn validate(config: ValidateConfig) -> Result<()> {
    let engine_config = match &config.config {
        Some(path) => Some(load_config(Some(path))?),
        None => None,
    };

    let mut results = Vec::new();
    if config.files.is_empty() {
        results.push(validate_text("<standard rules>", STANDARD_RULES, engine_config.as_ref()));
    }
    for file in &config.files {
        if config.verbose {
            eprintln!("Validating: {}", file.display());
        }
        let name = file.display().to_string();
        match fs::read_to_string(file) {
            Ok(text) => results.push(validate_text(&name, &text, engine_config.as_ref())),
            Err(e) => results.push(ValidationResult {
                name,
                criteria: 0,
                errors: vec![Diagnostic::error(
                    octofhir_acmg_diagnostics::ACMG0100,
                    format!("Failed to read file: {e}"),
                )],
                warnings: Vec::new(),
            }),
        }
    }

    let total_errors: usize = results.iter().map(|r| r.errors.len()).sum();
    let total_warnings: usize = results.iter().map(|r| r.warnings.len()).sum();
    for result in &results {
        print_validation_result(result);
    }

    println!();
    if total_errors == 0 && total_warnings == 0 {
        println!(
            "{}",
            output::format_success(&format!("All {} rule set(s) validated successfully", results.len()))
        );
        return Ok(());
    }

    let mut summary = Vec::new();
    if total_errors > 0 {
        summary.push(format!("{total_errors} error(s)").red().to_string());
    }
    if total_warnings > 0 {
        summary.push(format!("{total_warnings} warning(s)").yellow().to_string());
    }
    eprintln!("{} {}", "Found".bold(), summary.join(", "));

    if total_errors > 0 {
        anyhow::bail!("validation failed");
    }
    if config.strict {
        anyhow::bail!("strict mode: treating warnings as errors");
    }
    Ok(())
}

fn print_validation_result(result: &ValidationResult) {
    let status = if result.success() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {} ({} criteria)", status, result.name.cyan(), result.criteria);

    for diagnostic in result.errors.iter().chain(&result.warnings) {
        for line in diagnostic.render_colored().lines() {
            println!("  {line}");
        }
    }
}

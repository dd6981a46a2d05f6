//! ACMG/AMP variant classification for Rust
//!
//! This crate bundles the rule engine crates and the standard criteria set:
//! - Parsing condition expressions
//! - Loading rule sets and engine configuration
//! - Evaluating criteria per (gene, phenotype) with traces
//! - Aggregating met criteria into a five-tier classification
//!
//! # Example
//!
//! ```ignore
//! use octofhir_acmg::{EvaluationSession, VariantRecord, standard_rules};
//! use std::sync::Arc;
//!
//! let session = EvaluationSession::with_rules(Arc::new(standard_rules()?))?;
//! let report = session.evaluate(VariantRecord::from_json_str(&json)?).await?;
//! for row in report.summary() {
//!     println!("{} {}: {:?}", row.gene, row.phenotype, row.classification);
//! }
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_acmg_ast as ast;
pub use octofhir_acmg_diagnostics as diagnostics;
pub use octofhir_acmg_eval as eval;
pub use octofhir_acmg_model as model;
pub use octofhir_acmg_parser as parser;
pub use octofhir_acmg_types as types;

// Convenience re-exports
pub use octofhir_acmg_diagnostics::{AcmgError, Diagnostic, Result};
pub use octofhir_acmg_eval::{EngineConfig, EvaluationSession, RuleSet, SessionReport};
pub use octofhir_acmg_model::{Classification, HistoryStore, InMemoryHistoryStore, VariantRecord};
pub use octofhir_acmg_parser::parse_expression;

/// The standard ACMG/AMP criteria shipped with the crate
pub const STANDARD_RULES: &str = include_str!("../rules/acmg.yaml");

/// Load [`STANDARD_RULES`]
pub fn standard_rules() -> Result<RuleSet> {
    RuleSet::from_yaml_str(STANDARD_RULES)
}

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;

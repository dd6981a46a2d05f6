//! ACMG Evaluation Engine
//!
//! This crate evaluates a declarative rule set of ACMG criteria against variant
//! records and classifies every phenotype association. It provides:
//!
//! - **Rule sets**: YAML loading, validation, variable and criterion ordering
//! - **Condition evaluation**: Python-like operators with short-circuit `and`/`or`
//! - **Criterion state machine**: not applicable, needs manual input, graded levels
//! - **Traces**: every level records the expression with resolved values
//! - **History counts**: memoized, time-bounded lookups against a history store
//! - **Aggregation**: point totals mapped to a five-tier classification
//!
//! # Example
//!
//! ```ignore
//! use octofhir_acmg_eval::{EvaluationSession, RuleSet};
//! use octofhir_acmg_model::VariantRecord;
//! use std::sync::Arc;
//!
//! let rules = Arc::new(RuleSet::from_path("rules/acmg.yaml")?);
//! let session = EvaluationSession::with_rules(rules)?;
//! let report = session.evaluate(VariantRecord::from_json_str(&json)?).await?;
//! ```
//!
//! # Architecture
//!
//! - `RuleSet`: Parsed criteria, derived variables and constants
//! - `AcmgEngine`: Interprets condition trees against a `UnitContext`
//! - `UnitContext`: Per (gene, phenotype) state: views, memo, level results
//! - `EvaluationSession`: Runs all units of a record and writes results back
//!
//! # Missing data
//!
//! Names that resolve to nothing evaluate to `None`. Comparisons against `None`
//! are `None`, and `None` is falsy, so a condition over missing data is false.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod criterion;
pub mod definition;
pub mod engine;
pub mod error;
pub mod history;
pub mod operators;
mod order;
pub mod registry;
pub mod session;
pub mod trace;

// Re-export main types
pub use aggregate::{AggregationError, Tally, aggregate, classify, points, tally};
pub use config::{AggregationConfig, EngineConfig, HistoryConfig, PointsConfig};
pub use context::{BUILTIN_NAMES, CriterionRun, UnitContext, UnitKey};
pub use criterion::CriterionOutcome;
pub use definition::{CriterionDefinition, Level, RuleSet, VarDefinition, parse_condition_text};
pub use engine::{AcmgEngine, Traced};
pub use error::{EvalError, EvalResult};
pub use history::{HistoryAdapter, HistoryCount};
pub use registry::{FunctionFn, FunctionRegistry};
pub use session::{CancellationToken, EvaluationSession, PhenotypeSummary, SessionReport};

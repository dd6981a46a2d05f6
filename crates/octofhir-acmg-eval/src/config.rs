//! Engine configuration
//!
//! Named thresholds, aggregation point tables and history lookup limits,
//! loaded from YAML or JSON and immutable for the lifetime of a session.

use crate::definition::RuleSet;
use indexmap::IndexMap;
use octofhir_acmg_diagnostics::{ACMG0103, ACMG0104, ACMG0108, AcmgError, Result};
use octofhir_acmg_types::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Overrides for rule-set constants (`ba1_maf_limit_dominant: 0.05`)
    pub thresholds: IndexMap<String, Value>,
    pub aggregation: AggregationConfig,
    pub history: HistoryConfig,
    /// When false only the first phenotype entry of each gene is evaluated
    pub evaluate_all_phenotypes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: IndexMap::new(),
            aggregation: AggregationConfig::default(),
            history: HistoryConfig::default(),
            evaluate_all_phenotypes: true,
        }
    }
}

/// Point-based combination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    pub points: PointsConfig,
    pub pathogenic: u32,
    pub likely_pathogenic: u32,
    pub benign: u32,
    pub likely_benign: u32,
    /// Benign labels require fewer pathogenic points than this
    pub benign_max_pathogenic_points: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            points: PointsConfig::default(),
            pathogenic: 10,
            likely_pathogenic: 6,
            benign: 10,
            likely_benign: 6,
            benign_max_pathogenic_points: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointsConfig {
    pub very_strong: u32,
    pub strong: u32,
    pub moderate: u32,
    pub supporting: u32,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            very_strong: 8,
            strong: 4,
            moderate: 2,
            supporting: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub timeout_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl HistoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| AcmgError::config(ACMG0104, format!("invalid configuration: {e}")))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| AcmgError::config(ACMG0104, format!("invalid configuration: {e}")))
    }

    /// Load by extension: `.json` is JSON, anything else YAML
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// Check the configuration against the rule set it will run with
    pub fn validate(&self, rules: &RuleSet) -> Result<()> {
        let mut errors = Vec::new();

        let known = rules.threshold_names();
        for name in self.thresholds.keys() {
            if !known.contains(name.as_str()) {
                errors.push(AcmgError::config(
                    ACMG0103,
                    format!("unknown threshold `{name}`: not declared or referenced by the rule set"),
                ));
            }
        }

        let agg = &self.aggregation;
        let points = &agg.points;
        if [points.very_strong, points.strong, points.moderate, points.supporting].contains(&0) {
            errors.push(AcmgError::config(ACMG0108, "strength points must be positive"));
        }
        if [agg.pathogenic, agg.likely_pathogenic, agg.benign, agg.likely_benign].contains(&0) {
            errors.push(AcmgError::config(ACMG0108, "classification thresholds must be positive"));
        }
        if agg.likely_pathogenic > agg.pathogenic {
            errors.push(AcmgError::config(
                ACMG0108,
                "likely_pathogenic threshold exceeds pathogenic threshold",
            ));
        }
        if agg.likely_benign > agg.benign {
            errors.push(AcmgError::config(
                ACMG0108,
                "likely_benign threshold exceeds benign threshold",
            ));
        }
        if self.history.timeout_ms == 0 {
            errors.push(AcmgError::config(ACMG0104, "history.timeout_ms must be positive"));
        }

        match AcmgError::from_many(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

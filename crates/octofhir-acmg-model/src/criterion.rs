//! Per-criterion results
//!
//! A [`CriterionResult`] holds two disjoint field groups sharing one JSON object:
//! [`CalculatedOutcome`] is rewritten on every engine run, [`ReviewerInput`] belongs
//! to the curator and is only seeded on the first run.

use crate::classification::{CriterionState, Strength};
use indexmap::IndexMap;
use octofhir_acmg_types::Value;
use serde::{Deserialize, Deserializer, Serialize};

/// Engine-owned fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatedOutcome {
    pub calculated_state: CriterionState,
    pub calculated_strength: Strength,
    #[serde(deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(deserialize_with = "null_as_default")]
    pub info: IndexMap<String, Value>,
    /// Audit trace keyed by condition level (`cond_strong`, ...)
    #[serde(deserialize_with = "null_as_default")]
    pub evaluation: IndexMap<String, serde_json::Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Messages of the rule-authored warnings whose conditions held
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
}

/// Reviewer-owned fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewerInput {
    pub state: Option<CriterionState>,
    pub strength: Option<Strength>,
    #[serde(deserialize_with = "null_as_default")]
    pub reviser_comment: String,
}

/// Stored results may hold `null` where text or a map is expected
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    #[serde(flatten)]
    calculated: CalculatedOutcome,
    #[serde(flatten)]
    reviewer: ReviewerInput,
    /// Fields this engine does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl CriterionResult {
    pub fn calculated(&self) -> &CalculatedOutcome {
        &self.calculated
    }

    pub fn reviewer(&self) -> &ReviewerInput {
        &self.reviewer
    }

    /// Store a fresh engine outcome. Reviewer fields are left alone unless the
    /// state was never set, in which case they start from the calculated values.
    pub fn record(&mut self, outcome: CalculatedOutcome) {
        if self.reviewer.state.is_none() {
            self.reviewer.state = Some(outcome.calculated_state);
            self.reviewer.strength = Some(outcome.calculated_strength);
        }
        self.calculated = outcome;
    }

    /// Curator override
    pub fn review(&mut self, state: CriterionState, strength: Strength, comment: impl Into<String>) {
        self.reviewer = ReviewerInput {
            state: Some(state),
            strength: Some(strength),
            reviser_comment: comment.into(),
        };
    }

    /// Drop the override so the next run re-seeds it
    pub fn reset_review(&mut self) {
        self.reviewer = ReviewerInput::default();
    }

    /// State used for aggregation: the reviewer's when set, else the calculated one
    pub fn effective_state(&self) -> CriterionState {
        self.reviewer.state.unwrap_or(self.calculated.calculated_state)
    }

    pub fn effective_strength(&self) -> Strength {
        self.reviewer
            .strength
            .unwrap_or(self.calculated.calculated_strength)
    }

    /// Standalone matches record strength 4 and flag themselves in `info`
    pub fn is_standalone(&self) -> bool {
        self.calculated
            .info
            .get("standalone")
            .is_some_and(Value::is_truthy)
    }
}

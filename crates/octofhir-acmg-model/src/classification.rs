//! Criterion state, strength and classification labels

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} out of range: {value}")]
pub struct OutOfRange {
    pub kind: &'static str,
    pub value: i64,
}

/// Outcome of one criterion, stored as `-2..=1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum CriterionState {
    NotApplicable,
    /// Not evaluated yet, or waiting for curator input
    #[default]
    Undetermined,
    NotMet,
    Met,
}

impl CriterionState {
    pub fn code(self) -> i8 {
        match self {
            Self::NotApplicable => -2,
            Self::Undetermined => -1,
            Self::NotMet => 0,
            Self::Met => 1,
        }
    }

    pub fn is_met(self) -> bool {
        self == Self::Met
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NotApplicable => "not_applicable",
            Self::Undetermined => "needs_manual_input",
            Self::NotMet => "not_met",
            Self::Met => "met",
        }
    }
}

impl TryFrom<i8> for CriterionState {
    type Error = OutOfRange;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -2 => Ok(Self::NotApplicable),
            -1 => Ok(Self::Undetermined),
            0 => Ok(Self::NotMet),
            1 => Ok(Self::Met),
            other => Err(OutOfRange {
                kind: "state",
                value: i64::from(other),
            }),
        }
    }
}

impl From<CriterionState> for i8 {
    fn from(state: CriterionState) -> Self {
        state.code()
    }
}

impl fmt::Display for CriterionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evidence weight, stored as `0..=4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Strength {
    #[default]
    None,
    Supporting,
    Moderate,
    Strong,
    VeryStrong,
}

impl Strength {
    pub const ALL: [Strength; 5] = [
        Self::None,
        Self::Supporting,
        Self::Moderate,
        Self::Strong,
        Self::VeryStrong,
    ];

    pub fn code(self) -> i8 {
        match self {
            Self::None => 0,
            Self::Supporting => 1,
            Self::Moderate => 2,
            Self::Strong => 3,
            Self::VeryStrong => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Supporting => "supporting",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::VeryStrong => "very_strong",
        }
    }
}

impl TryFrom<i8> for Strength {
    type Error = OutOfRange;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == value)
            .ok_or(OutOfRange {
                kind: "strength",
                value: i64::from(value),
            })
    }
}

impl From<Strength> for i8 {
    fn from(strength: Strength) -> Self {
        strength.code()
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which axis a criterion contributes evidence to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Pathogenic,
    Benign,
}

impl Polarity {
    /// Polarity implied by an ACMG code prefix (`PVS1`, `BS1`)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.chars().next() {
            Some('P') => Some(Self::Pathogenic),
            Some('B') => Some(Self::Benign),
            _ => None,
        }
    }
}

/// Final five-tier label for a gene/phenotype pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "P")]
    Pathogenic,
    #[serde(rename = "LP")]
    LikelyPathogenic,
    #[serde(rename = "US", alias = "VUS")]
    UncertainSignificance,
    #[serde(rename = "LB")]
    LikelyBenign,
    #[serde(rename = "B")]
    Benign,
}

impl Classification {
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Pathogenic => "P",
            Self::LikelyPathogenic => "LP",
            Self::UncertainSignificance => "US",
            Self::LikelyBenign => "LB",
            Self::Benign => "B",
        }
    }

    pub fn is_pathogenic_leaning(self) -> bool {
        matches!(self, Self::Pathogenic | Self::LikelyPathogenic)
    }

    pub fn is_benign_leaning(self) -> bool {
        matches!(self, Self::Benign | Self::LikelyBenign)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pathogenic => "Pathogenic",
            Self::LikelyPathogenic => "Likely Pathogenic",
            Self::UncertainSignificance => "Uncertain Significance",
            Self::LikelyBenign => "Likely Benign",
            Self::Benign => "Benign",
        };
        f.write_str(name)
    }
}

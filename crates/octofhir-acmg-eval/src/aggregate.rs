//! Classification aggregator
//!
//! Sums points of met criteria on two independent axes and maps the totals to
//! a five-tier label. Reviewer state and strength take precedence over the
//! calculated ones.

use crate::config::AggregationConfig;
use crate::definition::RuleSet;
use octofhir_acmg_model::{Classification, CriterionResult, CriterionState, Polarity, Strength};
use serde::Serialize;
use thiserror::Error;

/// Inputs the aggregator cannot score
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("criterion `{0}` has no known polarity")]
    UnknownPolarity(String),

    #[error("criterion `{0}` is met without a strength")]
    MissingStrength(String),
}

/// Point totals for one phenotype
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub pathogenic: u32,
    pub benign: u32,
    /// A standalone benign criterion is met
    pub standalone_benign: bool,
}

pub fn points(strength: Strength, config: &AggregationConfig) -> u32 {
    let table = &config.points;
    match strength {
        Strength::None => 0,
        Strength::Supporting => table.supporting,
        Strength::Moderate => table.moderate,
        Strength::Strong => table.strong,
        Strength::VeryStrong => table.very_strong,
    }
}

/// Sum the points of met criteria. Polarity comes from the rule set, or from
/// the code prefix for results the rule set does not define.
pub fn tally<'a>(
    results: impl IntoIterator<Item = (&'a str, &'a CriterionResult)>,
    rules: &RuleSet,
    config: &AggregationConfig,
) -> Result<Tally, AggregationError> {
    let mut tally = Tally::default();
    for (code, result) in results {
        if result.effective_state() != CriterionState::Met {
            continue;
        }
        let polarity = rules
            .criterion(code)
            .map(|definition| definition.polarity)
            .or_else(|| Polarity::from_code(code))
            .ok_or_else(|| AggregationError::UnknownPolarity(code.to_string()))?;
        let strength = result.effective_strength();
        if strength == Strength::None {
            return Err(AggregationError::MissingStrength(code.to_string()));
        }

        let gained = points(strength, config);
        match polarity {
            Polarity::Pathogenic => tally.pathogenic += gained,
            Polarity::Benign => {
                tally.benign += gained;
                tally.standalone_benign |= result.is_standalone();
            }
        }
    }
    Ok(tally)
}

/// Decision table; pathogenic thresholds are checked first
pub fn classify(tally: &Tally, config: &AggregationConfig) -> Classification {
    let benign_allowed = tally.pathogenic < config.benign_max_pathogenic_points;
    if tally.standalone_benign {
        Classification::Benign
    } else if tally.pathogenic >= config.pathogenic {
        Classification::Pathogenic
    } else if tally.pathogenic >= config.likely_pathogenic {
        Classification::LikelyPathogenic
    } else if tally.benign >= config.benign && benign_allowed {
        Classification::Benign
    } else if tally.benign >= config.likely_benign && benign_allowed {
        Classification::LikelyBenign
    } else {
        Classification::UncertainSignificance
    }
}

pub fn aggregate<'a>(
    results: impl IntoIterator<Item = (&'a str, &'a CriterionResult)>,
    rules: &RuleSet,
    config: &AggregationConfig,
) -> Result<(Classification, Tally), AggregationError> {
    let tally = tally(results, rules, config)?;
    Ok((classify(&tally, config), tally))
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_acmg_model::CalculatedOutcome;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn met(strength: Strength) -> CriterionResult {
        let mut result = CriterionResult::default();
        result.record(CalculatedOutcome {
            calculated_state: CriterionState::Met,
            calculated_strength: strength,
            ..Default::default()
        });
        result
    }

    fn rules() -> RuleSet {
        RuleSet::from_yaml_str("criteria: {}\n").unwrap()
    }

    fn run(entries: &[(&str, CriterionResult)]) -> Result<(Classification, Tally), AggregationError> {
        aggregate(
            entries.iter().map(|(code, result)| (*code, result)),
            &rules(),
            &AggregationConfig::default(),
        )
    }

    #[rstest]
    #[case(vec![("BS1", Strength::Strong)], Classification::UncertainSignificance)]
    #[case(vec![("BS1", Strength::VeryStrong)], Classification::LikelyBenign)]
    #[case(vec![("BS1", Strength::VeryStrong), ("BP4", Strength::Supporting), ("BP7", Strength::Supporting)], Classification::Benign)]
    #[case(vec![("PVS1", Strength::VeryStrong), ("PM2", Strength::Supporting)], Classification::LikelyPathogenic)]
    #[case(vec![("PVS1", Strength::VeryStrong), ("PM2", Strength::Moderate)], Classification::Pathogenic)]
    #[case(vec![("BS1", Strength::VeryStrong), ("PM2", Strength::Moderate)], Classification::UncertainSignificance)]
    #[case(vec![], Classification::UncertainSignificance)]
    fn test_decision_table(#[case] met_criteria: Vec<(&str, Strength)>, #[case] expected: Classification) {
        let entries: Vec<(&str, CriterionResult)> =
            met_criteria.into_iter().map(|(code, strength)| (code, met(strength))).collect();
        assert_eq!(run(&entries).unwrap().0, expected);
    }

    #[test]
    fn test_standalone_benign_wins() {
        let mut ba1 = met(Strength::VeryStrong);
        let mut outcome = ba1.calculated().clone();
        outcome.info.insert("standalone".into(), true.into());
        ba1.record(outcome);

        let entries = vec![("BA1", ba1), ("PVS1", met(Strength::VeryStrong)), ("PS1", met(Strength::Strong))];
        let (label, tally) = run(&entries).unwrap();
        assert_eq!(label, Classification::Benign);
        assert_eq!(tally.pathogenic, 12);
    }

    #[test]
    fn test_reviewer_override_counts() {
        let mut pm1 = met(Strength::Moderate);
        pm1.review(CriterionState::NotMet, Strength::None, "not a hotspot");
        let entries = vec![("PVS1", met(Strength::VeryStrong)), ("PM1", pm1)];
        assert_eq!(run(&entries).unwrap().1.pathogenic, 8);
    }

    #[test]
    fn test_inconsistent_inputs() {
        let entries = vec![("XX1", met(Strength::Strong))];
        assert_eq!(run(&entries).unwrap_err(), AggregationError::UnknownPolarity("XX1".into()));

        let entries = vec![("PS3", met(Strength::None))];
        assert_eq!(run(&entries).unwrap_err(), AggregationError::MissingStrength("PS3".into()));
    }

    #[test]
    fn test_unmet_criteria_ignored() {
        let mut manual = CriterionResult::default();
        manual.record(CalculatedOutcome {
            calculated_state: CriterionState::Undetermined,
            calculated_strength: Strength::Strong,
            ..Default::default()
        });
        let entries = vec![("PS3", manual), ("PM2", met(Strength::Supporting))];
        assert_eq!(run(&entries).unwrap().1.pathogenic, 1);
    }
}

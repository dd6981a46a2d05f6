//! Standard Rule Set Tests
//!
//! End-to-end runs of the bundled criteria against a sample record:
//! - Loading and linting the bundled rules
//! - Classification without and with a history store
//! - Threshold overrides from a configuration file

use octofhir_acmg::cli::{load_config, load_rules};
use octofhir_acmg::{
    Classification, EngineConfig, EvaluationSession, InMemoryHistoryStore, RuleSet, SessionReport, VariantRecord,
    standard_rules,
};
use octofhir_acmg_model::{CriterionState, NoOpHistoryStore, PhenotypeEntry, Strength};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const RECORD: &str = include_str!("fixtures/record.json");
const HISTORY: &str = include_str!("fixtures/history.json");

async fn run(config: EngineConfig, store: Arc<dyn octofhir_acmg::HistoryStore>) -> SessionReport {
    let rules = Arc::new(standard_rules().unwrap());
    let session = EvaluationSession::new(rules, Arc::new(config), store).unwrap();
    session
        .evaluate(VariantRecord::from_json_str(RECORD).unwrap())
        .await
        .unwrap()
}

async fn run_plain() -> SessionReport {
    run(EngineConfig::default(), Arc::new(NoOpHistoryStore)).await
}

async fn run_with_history() -> SessionReport {
    let store = InMemoryHistoryStore::from_json_str(HISTORY).unwrap();
    run(EngineConfig::default(), Arc::new(store)).await
}

fn omim(report: &SessionReport) -> &PhenotypeEntry {
    &report.record.genes[0].phenotypes.omim[0]
}

fn orpha(report: &SessionReport) -> &PhenotypeEntry {
    &report.record.genes[0].phenotypes.orpha[0]
}

fn outcome(entry: &PhenotypeEntry, code: &str) -> (CriterionState, Strength) {
    let calculated = entry.acmg.criteria[code].calculated();
    (calculated.calculated_state, calculated.calculated_strength)
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_standard_rules_load_cleanly() {
    let rules = standard_rules().unwrap();
    for code in [
        "PVS1", "PS1", "PS2", "PS3", "PS4", "PM1", "PM2", "PM3", "PM4", "PM5", "PM6", "PP1", "PP2", "PP3",
        "PP4", "PPC", "BA1", "BS1", "BS2", "BS3", "BS4", "BP1", "BP2", "BP3", "BP4", "BP5", "BP6", "BP7", "BPC",
    ] {
        assert!(rules.is_criterion(code), "missing {code}");
    }
    assert_eq!(rules.lint(), vec![]);
}

#[test]
fn test_referenced_criteria_run_first() {
    let rules = standard_rules().unwrap();
    let order: Vec<&str> = rules.ordered().map(|c| c.code.as_str()).collect();
    let position = |code: &str| order.iter().position(|c| *c == code).unwrap();
    assert!(position("PVS1") < position("PM4"));
    assert!(position("PM2") < position("PS4"));
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn test_sample_record_without_history() {
    let report = run_plain().await;
    assert_eq!(report.warnings().count(), 0);
    assert_eq!(report.errors().count(), 0);

    let dominant = omim(&report);
    assert_eq!(outcome(dominant, "BS1"), (CriterionState::Met, Strength::Strong));
    assert_eq!(outcome(dominant, "PP3"), (CriterionState::Met, Strength::Supporting));
    assert_eq!(outcome(dominant, "PM2"), (CriterionState::NotMet, Strength::None));
    assert_eq!(outcome(dominant, "BA1"), (CriterionState::NotMet, Strength::None));
    assert_eq!(outcome(dominant, "PS2").0, CriterionState::Undetermined);
    assert_eq!(dominant.acmg.calculated_classification, Some(Classification::UncertainSignificance));

    let recessive = orpha(&report);
    assert_eq!(outcome(recessive, "BS1"), (CriterionState::NotMet, Strength::None));
    assert_eq!(outcome(recessive, "PM2"), (CriterionState::Met, Strength::Supporting));
    assert_eq!(recessive.acmg.calculated_classification, Some(Classification::UncertainSignificance));
}

#[tokio::test]
async fn test_sample_record_with_history() {
    let report = run_with_history().await;

    let dominant = omim(&report);
    assert_eq!(outcome(dominant, "PS1"), (CriterionState::Met, Strength::Strong));
    assert_eq!(outcome(dominant, "PM5"), (CriterionState::Met, Strength::Moderate));
    assert_eq!(outcome(dominant, "PP2"), (CriterionState::Met, Strength::Supporting));
    assert_eq!(dominant.acmg.calculated_classification, Some(Classification::LikelyPathogenic));
    assert_eq!(orpha(&report).acmg.calculated_classification, Some(Classification::LikelyPathogenic));

    let rows = report.summary();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].met.contains(&"PS1:strong".to_string()));
    assert!(rows[1].met.contains(&"PM2:supporting".to_string()));
}

#[tokio::test]
async fn test_missing_protein_change_needs_review() {
    let record = RECORD.replace("\"protein_change\": \"p.Ile59Thr\",", "");
    let rules = Arc::new(standard_rules().unwrap());
    let session = EvaluationSession::with_rules(rules).unwrap();
    let report = session
        .evaluate(VariantRecord::from_json_str(&record).unwrap())
        .await
        .unwrap();

    let ps1 = omim(&report).acmg.criteria["PS1"].calculated();
    assert_eq!(
        (ps1.calculated_state, ps1.calculated_strength),
        (CriterionState::Undetermined, Strength::Strong)
    );
    assert_eq!(ps1.evaluation["cond_strong"]["skipped"], serde_json::json!(true));
    assert_eq!(report.warnings().count(), 0);
}

#[tokio::test]
async fn test_missing_frequency_raises_rule_warning() {
    let record = RECORD.replace("\"maf\": {\"max\": 0.000399361, \"max_subpop\": \"nfe\"}", "\"maf\": null");
    let rules = Arc::new(standard_rules().unwrap());
    let session = EvaluationSession::with_rules(rules).unwrap();
    let report = session
        .evaluate(VariantRecord::from_json_str(&record).unwrap())
        .await
        .unwrap();

    let ba1 = omim(&report).acmg.criteria["BA1"].calculated();
    assert_eq!(ba1.calculated_state, CriterionState::NotMet);
    assert_eq!(ba1.warnings.len(), 1);
    assert!(ba1.warnings[0].starts_with("No population frequency available"));
}

#[tokio::test]
async fn test_trace_records_resolved_values() {
    let report = run_plain().await;
    let bs1 = omim(&report).acmg.criteria["BS1"].calculated();
    let trace = serde_json::to_string(&bs1.evaluation["cond_strong"]).unwrap();
    assert!(trace.contains("0.000399361 (maf)"), "{trace}");
    assert!(trace.contains("0.0002 (bs1_strong_maf_limit_dominant)"), "{trace}");
}

// ============================================================================
// Configuration
// ============================================================================

#[rstest]
#[case("thresholds:\n  pp3_revel_score_limit: 0.9\n", CriterionState::NotMet)]
#[case("thresholds:\n  pp3_revel_score_limit: 0.5\n", CriterionState::Met)]
#[tokio::test]
async fn test_threshold_override_from_file(#[case] text: &str, #[case] expected: CriterionState) {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();

    let config = load_config(Some(file.path())).unwrap();
    let report = run(config, Arc::new(NoOpHistoryStore)).await;
    assert_eq!(outcome(omim(&report), "PP3").0, expected);
}

#[test]
fn test_unknown_threshold_rejected() {
    let rules = Arc::new(standard_rules().unwrap());
    let config = EngineConfig::from_yaml_str("thresholds:\n  pp3_revel_limit: 0.9\n").unwrap();
    let result = EvaluationSession::new(rules, Arc::new(config), Arc::new(NoOpHistoryStore));
    assert!(result.is_err());
}

#[test]
fn test_rules_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"criteria:\n  PP3:\n    cond_supporting: \"revel_score >= 0.5\"\n").unwrap();

    let rules = load_rules(Some(file.path())).unwrap();
    assert_eq!(rules.len(), 1);
    assert!(load_rules(None).unwrap().len() > 20);
    assert!(RuleSet::from_path(file.path().with_extension("missing")).is_err());
}

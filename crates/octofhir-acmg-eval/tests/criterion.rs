//! Criterion Evaluation Tests
//!
//! Tests for the per-criterion state machine run through a session:
//! - Level order and short-circuiting
//! - Needs-manual-input and not-applicable outcomes
//! - Failed and malformed conditions
//! - Criteria reading other criteria (`PVS1.match`)
//! - `info` values and standalone matches
//! - Rule-authored warnings

use octofhir_acmg_diagnostics::{ACMG0002, ACMG0204, ACMG0302};
use octofhir_acmg_eval::{EvaluationSession, RuleSet, SessionReport};
use octofhir_acmg_model::{Classification, CriterionResult, CriterionState, Strength, VariantRecord};
use octofhir_acmg_types::Value;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const RECORD: &str = r#"{
    "_id": "v1",
    "chromosome": "12",
    "position": 121786614,
    "genes": [{
        "gene": "DIABLO",
        "annotations": {"impact": "missense_variant", "maf": {"max": 0.000399361}},
        "phenotypes": {"omim": [{"phenotype": "Deafness", "inheritance_mode": "AD"}]}
    }]
}"#;

async fn evaluate_record(rules: &str, record: &str) -> SessionReport {
    let rules = Arc::new(RuleSet::from_yaml_str(rules).unwrap());
    let session = EvaluationSession::with_rules(rules).unwrap();
    session
        .evaluate(VariantRecord::from_json_str(record).unwrap())
        .await
        .unwrap()
}

async fn evaluate(rules: &str) -> SessionReport {
    evaluate_record(rules, RECORD).await
}

fn result<'a>(report: &'a SessionReport, code: &str) -> &'a CriterionResult {
    &report.record.genes[0].phenotypes.omim[0].acmg.criteria[code]
}

fn outcome(report: &SessionReport, code: &str) -> (CriterionState, Strength) {
    let calculated = result(report, code).calculated();
    (calculated.calculated_state, calculated.calculated_strength)
}

// ============================================================================
// Level Order
// ============================================================================

#[tokio::test]
async fn test_first_true_level_decides() {
    let report = evaluate(
        r#"
criteria:
  PS1:
    cond_very_strong: "False"
    cond_strong: "'missense' in impact"
    cond_moderate: true
"#,
    )
    .await;

    assert_eq!(outcome(&report, "PS1"), (CriterionState::Met, Strength::Strong));
    let evaluation = &result(&report, "PS1").calculated().evaluation;
    assert_eq!(evaluation["cond_very_strong"]["result"], json!(false));
    assert_eq!(evaluation["cond_strong"]["result"], json!(true));
    assert_eq!(evaluation["cond_moderate"]["skipped"], json!(true));
}

#[tokio::test]
async fn test_nothing_true_is_not_met() {
    let report = evaluate("criteria:\n  PM2:\n    cond_moderate: \"maf < 0.0001\"\n").await;
    assert_eq!(outcome(&report, "PM2"), (CriterionState::NotMet, Strength::None));
    assert_eq!(
        result(&report, "PM2").calculated().evaluation["cond_moderate"],
        json!({"expression": "0.000399361 (maf) < 0.0001", "result": false})
    );
}

#[tokio::test]
async fn test_not_applicable_short_circuits() {
    let report = evaluate(
        r#"
criteria:
  BP7:
    cond_not_applicable: "'missense' in impact"
    cond_supporting: "spliceai(gene) < 0.1"
"#,
    )
    .await;

    assert_eq!(outcome(&report, "BP7"), (CriterionState::NotApplicable, Strength::None));
    assert_eq!(
        result(&report, "BP7").calculated().evaluation["cond_supporting"]["skipped"],
        json!(true)
    );
    assert_eq!(report.warnings().count(), 0);
}

#[tokio::test]
async fn test_needs_manual_input_keeps_nominal_strength() {
    let report = evaluate("criteria:\n  PS3:\n    cond_needs_manual_input: true\n    cond_strong: true\n").await;

    assert_eq!(outcome(&report, "PS3"), (CriterionState::Undetermined, Strength::Strong));
    let reviewer = result(&report, "PS3").reviewer();
    assert_eq!(reviewer.state, Some(CriterionState::Undetermined));
    assert_eq!(
        report.record.genes[0].phenotypes.omim[0].acmg.calculated_classification,
        Some(Classification::UncertainSignificance)
    );
}

#[tokio::test]
async fn test_declared_strength_sets_nominal() {
    let report = evaluate(
        "criteria:\n  PP1:\n    strength: strong\n    cond_needs_manual_input: true\n",
    )
    .await;
    assert_eq!(outcome(&report, "PP1"), (CriterionState::Undetermined, Strength::Strong));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_level_is_false_and_noted() {
    let report = evaluate(
        r#"
criteria:
  PM1:
    cond_moderate: "impact + 1 > 0"
    cond_supporting: "True"
"#,
    )
    .await;

    assert_eq!(outcome(&report, "PM1"), (CriterionState::Met, Strength::Supporting));
    let calculated = result(&report, "PM1").calculated();
    assert!(calculated.comment.starts_with("error in cond_moderate:"));
    assert!(calculated.evaluation["cond_moderate"]["error"].is_string());

    let warnings: Vec<_> = report.warnings().filter(|d| d.code == ACMG0204).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].criterion.as_deref(), Some("PM1"));
    assert_eq!(warnings[0].subject.as_deref(), Some("DIABLO/omim:Deafness"));
}

#[tokio::test]
async fn test_malformed_condition_warns_once_per_record() {
    let record = r#"{
        "_id": "v2", "chromosome": "1", "position": 100,
        "genes": [{
            "gene": "GJB2",
            "annotations": {"revel_score": 0.9},
            "phenotypes": {
                "omim": [{"phenotype": "Deafness", "inheritance_mode": "AR"}],
                "orpha": [{"phenotype": "Hearing loss", "inheritance_mode": "AR"}]
            }
        }]
    }"#;
    let report = evaluate_record(
        "criteria:\n  PP3:\n    cond_supporting: \"revel_score >= \"\n  PP2:\n    cond_supporting: true\n",
        record,
    )
    .await;

    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, ACMG0002);
    assert_eq!(warnings[0].criterion.as_deref(), Some("PP3"));

    let gene = &report.record.genes[0];
    for entry in gene.phenotypes.omim.iter().chain(&gene.phenotypes.orpha) {
        let pp3 = &entry.acmg.criteria["PP3"];
        assert_eq!(pp3.calculated().calculated_state, CriterionState::NotMet);
        assert_eq!(entry.acmg.criteria["PP2"].calculated().calculated_state, CriterionState::Met);
    }
}

#[tokio::test]
async fn test_malformed_history_query_counts_zero() {
    let report = evaluate(
        "criteria:\n  PM1:\n    cond_moderate: \"history_count(codon__near=codon) == 0 and dominant\"\n",
    )
    .await;

    assert_eq!(outcome(&report, "PM1"), (CriterionState::Met, Strength::Moderate));
    let calculated = result(&report, "PM1").calculated();
    assert_eq!(calculated.comment, "");
    assert_eq!(
        calculated.evaluation["cond_moderate"]["expression"],
        json!("0 (history_count(codon__near=codon)) == 0 and True (dominant)")
    );

    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, ACMG0302);
    assert_eq!(warnings[0].criterion.as_deref(), Some("PM1"));
    assert!(warnings[0].message.contains("near"));
}

// ============================================================================
// Criterion References
// ============================================================================

#[tokio::test]
async fn test_criteria_read_earlier_results() {
    let report = evaluate(
        r#"
criteria:
  PM4:
    cond_moderate: "not PVS1.match"
  PP3:
    cond_supporting: "PVS1.very_strong and PVS1.state == 1"
  PVS1:
    cond_very_strong: "'missense' in impact"
"#,
    )
    .await;

    assert_eq!(outcome(&report, "PVS1"), (CriterionState::Met, Strength::VeryStrong));
    assert_eq!(outcome(&report, "PM4"), (CriterionState::NotMet, Strength::None));
    assert_eq!(outcome(&report, "PP3"), (CriterionState::Met, Strength::Supporting));
}

#[tokio::test]
async fn test_cond_match_is_separate_from_state() {
    let report = evaluate(
        r#"
criteria:
  BS1:
    cond_strong: true
    cond_match: "False"
  BP4:
    cond_supporting: "not BS1.match and BS1.strong"
"#,
    )
    .await;

    assert_eq!(outcome(&report, "BS1"), (CriterionState::Met, Strength::Strong));
    assert_eq!(outcome(&report, "BP4"), (CriterionState::Met, Strength::Supporting));
}

// ============================================================================
// Info and Standalone
// ============================================================================

#[tokio::test]
async fn test_info_values_and_standalone() {
    let report = evaluate(
        r#"
criteria:
  BA1:
    description: Allele frequency above 5%
    cond_standalone: "maf > 0.0001"
    info:
      observed_maf: maf
      scaled: "maf * 1000"
"#,
    )
    .await;

    assert_eq!(outcome(&report, "BA1"), (CriterionState::Met, Strength::VeryStrong));
    let calculated = result(&report, "BA1").calculated();
    assert_eq!(calculated.description, "Allele frequency above 5%");
    assert_eq!(calculated.info["standalone"], Value::Bool(true));
    assert_eq!(
        calculated.info["observed_maf"],
        Value::Decimal(Decimal::from_str("0.000399361").unwrap())
    );
    assert_eq!(
        calculated.info["scaled"],
        Value::Decimal(Decimal::from_str("0.399361").unwrap())
    );
    assert_eq!(
        report.record.genes[0].phenotypes.omim[0].acmg.calculated_classification,
        Some(Classification::Benign)
    );
}

// ============================================================================
// Rule-Authored Warnings
// ============================================================================

#[tokio::test]
async fn test_warnings_attach_messages() {
    let report = evaluate(
        r#"
warnings:
  rare_in_controls: Frequency is low but above the dominant limit
  no_revel: REVEL score missing
criteria:
  BS1:
    cond_strong: "maf >= 0.001"
    warn:
      rare_in_controls: "dominant and maf >= 0.0002"
      no_revel: "revel_score is None"
      undeclared: "True"
      broken: "impact + 1 > 0"
"#,
    )
    .await;

    assert_eq!(outcome(&report, "BS1"), (CriterionState::NotMet, Strength::None));
    let calculated = result(&report, "BS1").calculated();
    assert_eq!(
        calculated.warnings,
        vec![
            "Frequency is low but above the dominant limit".to_string(),
            "REVEL score missing".to_string(),
            "Warning: undeclared".to_string(),
        ]
    );
    assert_eq!(calculated.evaluation["warn.no_revel"]["result"], json!(true));
    assert!(calculated.evaluation["warn.broken"]["error"].is_string());
    assert!(calculated.comment.starts_with("error in warn.broken:"));

    let serialized = serde_json::to_value(result(&report, "BS1")).unwrap();
    assert_eq!(serialized["warnings"][2], json!("Warning: undeclared"));
}

#[tokio::test]
async fn test_no_warnings_are_not_serialized() {
    let report = evaluate("criteria:\n  PP3:\n    cond_supporting: true\n    warn:\n      never: \"False\"\n").await;
    let serialized = serde_json::to_value(result(&report, "PP3")).unwrap();
    assert!(serialized.get("warnings").is_none());
}

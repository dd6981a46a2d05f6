//! Document Value Tests
//!
//! Values built from record JSON as the resolver sees them:
//! - Nested member and index lookup
//! - Threshold comparisons against JSON numbers
//! - Truthiness of absent and empty annotations

use octofhir_acmg_types::{Value, decimal_from_text, divide};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use std::cmp::Ordering;

fn annotations() -> Value {
    Value::from_json(&json!({
        "impact": "missense_variant",
        "codon": 59,
        "revel_score": 0.82,
        "protein_domains": [],
        "maf": {"max": 2e-05, "max_subpop": "nfe"},
        "transcripts": [{"id": "ENST00000267169"}, {"id": "ENST00000443649"}],
        "splicing_type": null
    }))
}

#[test]
fn test_nested_lookup() {
    let doc = annotations();
    let maf = doc.get("maf").and_then(|m| m.get("max_subpop"));
    assert_eq!(maf, Some(&Value::from("nfe")));
    let second = doc.get("transcripts").and_then(|t| t.get("1")).and_then(|t| t.get("id"));
    assert_eq!(second, Some(&Value::from("ENST00000443649")));
    assert_eq!(doc.get("transcripts").and_then(|t| t.get("7")), None);
}

#[test]
fn test_scientific_maf_compares_exactly() {
    let doc = annotations();
    let maf = doc.get("maf").and_then(|m| m.get("max")).cloned().unwrap();
    let limit = Value::Decimal(decimal_from_text("0.00002").unwrap());
    assert_eq!(maf.partial_compare(&limit), Some(Ordering::Equal));
    assert!(maf.loose_eq(&limit));
}

#[rstest]
#[case("impact", true)]
#[case("codon", true)]
#[case("protein_domains", false)]
#[case("splicing_type", false)]
fn test_annotation_truthiness(#[case] key: &str, #[case] truthy: bool) {
    let doc = annotations();
    assert_eq!(doc.get(key).map(Value::is_truthy), Some(truthy));
}

#[test]
fn test_points_ratio() {
    let doc = annotations();
    let codon = doc.get("codon").cloned().unwrap();
    let ratio = divide(&codon, &Value::Integer(4)).unwrap();
    assert_eq!(ratio, Value::Decimal(decimal_from_text("14.75").unwrap()));
}

//! Expression Evaluation Tests
//!
//! Tests for condition expressions evaluated against one phenotype unit:
//! - Name resolution (thresholds, derived vars, record fields, builtins)
//! - Python-like operators over missing data
//! - Function calls and the function registry
//! - Trace rendering with resolved values

use indexmap::IndexMap;
use octofhir_acmg_diagnostics::{ACMG0105, ACMG0201, DiagnosticLog};
use octofhir_acmg_eval::{
    AcmgEngine, EvalError, FunctionRegistry, HistoryAdapter, RuleSet, UnitContext, parse_condition_text,
};
use octofhir_acmg_model::{NoOpHistoryStore, VariantRecord};
use octofhir_acmg_types::Value;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

const RECORD: &str = r#"{
    "_id": "v1",
    "chromosome": "12",
    "position": 121786614,
    "change": {"ref": {"base": "A"}, "alt": {"base": "G"}},
    "zygosity": "het",
    "genes": [{
        "gene": "DIABLO",
        "annotations": {
            "impact": "missense_variant",
            "codon": 59,
            "protein_change": "p.Ser59Pro",
            "revel_score": 0.82,
            "maf": {"max": 0.000399361, "max_subpop": "nfe"}
        },
        "phenotypes": {"omim": [{"phenotype": "Deafness", "inheritance_mode": "AD"}]}
    }]
}"#;

const RULES: &str = r#"
consts:
  bs1_strong_maf_limit_dominant: 0.0002
  pp3_revel: 0.7
vars:
  revel: annotations.revel_score
  damaging: { expr: "revel >= pp3_revel" }
  is_missense: { cond: { or: ["'missense' in impact", "'inframe' in impact"] } }
criteria: {}
"#;

struct Fixture {
    rules: RuleSet,
    overrides: IndexMap<String, Value>,
    history: HistoryAdapter,
    log: DiagnosticLog,
    cancelled: AtomicBool,
    record: VariantRecord,
}

impl Fixture {
    fn new() -> Self {
        Self::with_rules(RULES)
    }

    fn with_rules(rules: &str) -> Self {
        Self {
            rules: RuleSet::from_yaml_str(rules).unwrap(),
            overrides: IndexMap::new(),
            history: HistoryAdapter::new(Arc::new(NoOpHistoryStore), Duration::from_secs(1)),
            log: DiagnosticLog::new(),
            cancelled: AtomicBool::new(false),
            record: VariantRecord::from_json_str(RECORD).unwrap(),
        }
    }

    fn ctx(&self) -> UnitContext<'_> {
        let gene = &self.record.genes[0];
        let (source, _, phenotype) = gene.phenotypes.iter().next().unwrap();
        UnitContext::new(
            &self.rules,
            &self.overrides,
            &self.history,
            &self.log,
            &self.cancelled,
            &self.record,
            gene,
            source,
            phenotype,
        )
        .unwrap()
    }
}

async fn eval_with(engine: &AcmgEngine, fixture: &Fixture, text: &str) -> Result<Value, EvalError> {
    let condition = parse_condition_text(text);
    let octofhir_acmg_ast::Condition::Expr(parsed) = &condition else {
        panic!("`{text}` did not parse");
    };
    let ctx = fixture.ctx();
    engine.evaluate(&parsed.expr, &ctx).await
}

async fn eval(text: &str) -> Value {
    eval_with(&AcmgEngine::new(), &Fixture::new(), text).await.unwrap()
}

fn dec(text: &str) -> Value {
    Value::Decimal(Decimal::from_str(text).unwrap())
}

// ============================================================================
// Name Resolution
// ============================================================================

#[tokio::test]
async fn test_builtins() {
    assert_eq!(eval("gene").await, Value::from("DIABLO"));
    assert_eq!(eval("maf").await, dec("0.000399361"));
    assert_eq!(eval("dominant").await, Value::Bool(true));
    assert_eq!(eval("recessive").await, Value::Bool(false));
    assert_eq!(eval("phenotype_source").await, Value::from("omim"));
    assert_eq!(eval("alt").await, Value::from("G"));
}

#[tokio::test]
async fn test_record_fields_and_paths() {
    assert_eq!(eval("impact").await, Value::from("missense_variant"));
    assert_eq!(eval("codon").await, Value::Integer(59));
    assert_eq!(eval("annotations.maf.max_subpop").await, Value::from("nfe"));
    assert_eq!(eval("zygosity").await, Value::from("het"));
}

#[tokio::test]
async fn test_thresholds_and_derived_vars() {
    assert_eq!(eval("bs1_strong_maf_limit_dominant").await, dec("0.0002"));
    assert_eq!(eval("revel").await, dec("0.82"));
    assert_eq!(eval("damaging").await, Value::Bool(true));
    assert_eq!(eval("is_missense").await, Value::Bool(true));
}

#[tokio::test]
async fn test_threshold_override() {
    let mut fixture = Fixture::new();
    fixture.overrides.insert("pp3_revel".to_string(), dec("0.9"));
    let value = eval_with(&AcmgEngine::new(), &fixture, "damaging").await.unwrap();
    assert_eq!(value, Value::Bool(false));
}

#[tokio::test]
async fn test_unknown_name_is_none_and_reported_once() {
    let fixture = Fixture::new();
    let engine = AcmgEngine::new();
    let ctx = fixture.ctx();
    for _ in 0..3 {
        let condition = parse_condition_text("cadd_phred > 20");
        let traced = engine.evaluate_condition(&condition, &ctx).await;
        assert_eq!(traced.result, Ok(false));
    }
    let reported = fixture.log.with_code(ACMG0201);
    assert_eq!(reported.len(), 1);
    assert!(reported[0].message.contains("cadd_phred"));
}

// ============================================================================
// Operators
// ============================================================================

#[rstest]
#[case("1 + 2 * 3", Value::Integer(7))]
#[case("(1 + 2) * 3", Value::Integer(9))]
#[case("7 / 2", dec("3.5"))]
#[case("-codon", Value::Integer(-59))]
#[case("'missense' in impact", Value::Bool(true))]
#[case("'nfe' not in ['afr', 'eas']", Value::Bool(true))]
#[case("zygosity == 'het' and codon", Value::Integer(59))]
#[case("0 or 'fallback'", Value::from("fallback"))]
#[case("not impact", Value::Bool(false))]
#[case("1 < codon <= 59", Value::Bool(true))]
#[case("None is None", Value::Bool(true))]
#[case("missing == 1", Value::Bool(false))]
#[tokio::test]
async fn test_operator_semantics(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(eval(text).await, expected);
}

#[rstest]
#[case("missing > 1")]
#[case("missing >= 1")]
#[case("not missing")]
#[case("1 in missing")]
#[case("missing + 1")]
#[tokio::test]
async fn test_missing_data_stays_unknown(#[case] text: &str) {
    assert_eq!(eval(text).await, Value::None);
}

#[tokio::test]
async fn test_short_circuit_skips_errors() {
    assert_eq!(eval("False and 1 / 0").await, Value::Bool(false));
    assert_eq!(eval("True or 1 / 0").await, Value::Bool(true));
}

#[tokio::test]
async fn test_type_errors() {
    let fixture = Fixture::new();
    let engine = AcmgEngine::new();
    let err = eval_with(&engine, &fixture, "impact + 1").await.unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { .. }));
    let err = eval_with(&engine, &fixture, "codon / 0").await.unwrap_err();
    assert_eq!(err, EvalError::DivisionByZero);
}

// ============================================================================
// Functions
// ============================================================================

#[tokio::test]
async fn test_standard_functions() {
    assert_eq!(eval("len(impact)").await, Value::Integer(16));
    assert_eq!(eval("max(1, codon, 3)").await, Value::Integer(59));
    assert_eq!(eval("min([4, 2, 9])").await, Value::Integer(2));
    assert_eq!(eval("abs(-2.5)").await, dec("2.5"));
    assert_eq!(eval("len(missing)").await, Value::None);
}

#[tokio::test]
async fn test_unknown_function_fails() {
    let fixture = Fixture::new();
    let err = eval_with(&AcmgEngine::new(), &fixture, "spliceai(gene)").await.unwrap_err();
    assert_eq!(err.code(), ACMG0105);
}

#[tokio::test]
async fn test_registered_function() {
    let mut functions = FunctionRegistry::with_standard_functions();
    functions.register(
        "double",
        Arc::new(|args: &[Value]| match args {
            [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
            _ => Err(EvalError::invalid_arguments("double", "expected one integer")),
        }),
    );
    let engine = AcmgEngine::with_functions(functions);
    let value = eval_with(&engine, &Fixture::new(), "double(codon)").await.unwrap();
    assert_eq!(value, Value::Integer(118));
}

#[tokio::test]
async fn test_history_count_with_noop_store() {
    let value = eval("history_count(gene=gene, protein_change=protein_change, variant_id__ne=variant_id)").await;
    assert_eq!(value, Value::Integer(0));
}

#[tokio::test]
async fn test_history_count_rejects_positional_arguments() {
    let fixture = Fixture::new();
    let err = eval_with(&AcmgEngine::new(), &fixture, "history_count(gene)").await.unwrap_err();
    assert!(matches!(err, EvalError::InvalidArguments { .. }));
}

// ============================================================================
// Traces
// ============================================================================

#[tokio::test]
async fn test_leaf_trace_shows_values() {
    let fixture = Fixture::new();
    let engine = AcmgEngine::new();
    let ctx = fixture.ctx();
    let condition = parse_condition_text("dominant and maf >= bs1_strong_maf_limit_dominant");
    let traced = engine.evaluate_condition(&condition, &ctx).await;

    assert_eq!(traced.result, Ok(true));
    assert_eq!(
        traced.trace,
        json!({
            "expression": "True (dominant) and 0.000399361 (maf) >= 0.0002 (bs1_strong_maf_limit_dominant)",
            "result": true
        })
    );
}

#[tokio::test]
async fn test_node_trace_marks_skipped_children() {
    let fixture = Fixture::with_rules(
        "criteria:\n  BS1:\n    cond_strong:\n      or: [dominant, \"maf > 1\"]\n",
    );
    let engine = AcmgEngine::new();
    let ctx = fixture.ctx();
    let condition = fixture.rules.criterion("BS1").unwrap().all_conditions().next().unwrap();
    let traced = engine.evaluate_condition(condition, &ctx).await;

    assert!(traced.is_true());
    assert_eq!(
        traced.trace,
        json!({
            "or": [
                {"expression": "True (dominant)", "result": true},
                {"expression": "maf > 1", "skipped": true}
            ],
            "result": true
        })
    );
}

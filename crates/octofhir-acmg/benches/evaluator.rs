//! Evaluator benchmarks using divan
//!
//! Benchmarks for evaluating the standard rules against one record.

use octofhir_acmg::{EvaluationSession, InMemoryHistoryStore, VariantRecord, standard_rules};
use std::sync::Arc;

fn main() {
    divan::main();
}

const RECORD: &str = include_str!("../tests/fixtures/record.json");
const HISTORY: &str = include_str!("../tests/fixtures/history.json");

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[divan::bench]
fn record_without_history(bencher: divan::Bencher) {
    let rt = runtime();
    let session = EvaluationSession::with_rules(Arc::new(standard_rules().unwrap())).unwrap();
    let record = VariantRecord::from_json_str(RECORD).unwrap();

    bencher.bench_local(|| rt.block_on(session.evaluate(divan::black_box(record.clone()))));
}

#[divan::bench]
fn record_with_history(bencher: divan::Bencher) {
    let rt = runtime();
    let store = InMemoryHistoryStore::from_json_str(HISTORY).unwrap();
    let session = EvaluationSession::new(
        Arc::new(standard_rules().unwrap()),
        Arc::new(Default::default()),
        Arc::new(store),
    )
    .unwrap();
    let record = VariantRecord::from_json_str(RECORD).unwrap();

    bencher.bench_local(|| rt.block_on(session.evaluate(divan::black_box(record.clone()))));
}

#[divan::bench(args = [1, 8, 32])]
fn batch(bencher: divan::Bencher, size: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let session = EvaluationSession::with_rules(Arc::new(standard_rules().unwrap())).unwrap();
    let record = VariantRecord::from_json_str(RECORD).unwrap();
    let records: Vec<_> = (0..size).map(|_| record.clone()).collect();

    bencher.bench_local(|| rt.block_on(session.evaluate_all(divan::black_box(records.clone()))));
}

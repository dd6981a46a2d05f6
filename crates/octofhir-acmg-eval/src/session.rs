//! Evaluation session
//!
//! Runs every criterion of a rule set against every phenotype entry of a
//! variant record, aggregates each phenotype, and writes the results back into
//! the record. Phenotype units of one record run concurrently and share one
//! history memo; independent records may be evaluated in parallel.

use crate::aggregate::aggregate;
use crate::config::EngineConfig;
use crate::context::{UnitContext, UnitKey};
use crate::definition::RuleSet;
use crate::engine::AcmgEngine;
use crate::history::HistoryAdapter;
use futures::future::join_all;
use indexmap::IndexMap;
use octofhir_acmg_diagnostics::{ACMG0206, ACMG0400, ACMG0402, AcmgError, Diagnostic, DiagnosticLog, Result};
use octofhir_acmg_model::{
    CalculatedOutcome, Classification, HistoryStore, NoOpHistoryStore, PhenotypeSource, VariantRecord,
};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag, checked between criteria
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The enriched record plus everything reported while producing it
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub record: VariantRecord,
    pub diagnostics: Vec<Diagnostic>,
    /// Evaluation stopped early; results computed so far are kept but no
    /// phenotype was classified after the stop
    pub cancelled: bool,
}

/// One row of the classification summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhenotypeSummary {
    pub gene: String,
    pub source: PhenotypeSource,
    pub phenotype: String,
    pub classification: Option<Classification>,
    pub met: Vec<String>,
}

impl SessionReport {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Calculated label and met criteria of every phenotype entry
    pub fn summary(&self) -> Vec<PhenotypeSummary> {
        self.record
            .genes
            .iter()
            .flat_map(|gene| {
                gene.phenotypes.iter().map(move |(source, _, entry)| PhenotypeSummary {
                    gene: gene.gene.clone(),
                    source,
                    phenotype: entry.phenotype.clone(),
                    classification: entry.acmg.calculated_classification,
                    met: entry
                        .acmg
                        .criteria
                        .iter()
                        .filter(|(_, result)| result.effective_state().is_met())
                        .map(|(code, result)| format!("{code}:{}", result.effective_strength().name()))
                        .collect(),
                })
            })
            .collect()
    }
}

/// Results of one phenotype unit, applied to the record after all units finish
struct UnitOutcome {
    key: UnitKey,
    results: IndexMap<String, CalculatedOutcome>,
    cancelled: bool,
}

#[derive(Clone)]
pub struct EvaluationSession {
    rules: Arc<RuleSet>,
    config: Arc<EngineConfig>,
    store: Arc<dyn HistoryStore>,
    engine: Arc<AcmgEngine>,
}

impl EvaluationSession {
    /// Create a session; the configuration is validated against the rule set
    pub fn new(rules: Arc<RuleSet>, config: Arc<EngineConfig>, store: Arc<dyn HistoryStore>) -> Result<Self> {
        config.validate(&rules)?;
        Ok(Self {
            rules,
            config,
            store,
            engine: Arc::new(AcmgEngine::new()),
        })
    }

    /// Session with default configuration and no history backend
    pub fn with_rules(rules: Arc<RuleSet>) -> Result<Self> {
        Self::new(rules, Arc::new(EngineConfig::default()), Arc::new(NoOpHistoryStore::new()))
    }

    /// Replace the engine (e.g. one with extra registered functions)
    pub fn with_engine(mut self, engine: AcmgEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn evaluate(&self, record: VariantRecord) -> Result<SessionReport> {
        self.evaluate_with_cancellation(record, &CancellationToken::new()).await
    }

    /// Evaluate one record. A record failing required-field validation is an
    /// error; every other problem is reported in the returned diagnostics.
    pub async fn evaluate_with_cancellation(
        &self,
        mut record: VariantRecord,
        token: &CancellationToken,
    ) -> Result<SessionReport> {
        record.validate()?;

        let log = DiagnosticLog::new();
        let history = HistoryAdapter::new(Arc::clone(&self.store), self.config.history.timeout());
        let units = self.units(&record);
        log::debug!(
            "evaluating record {}: {} phenotype unit(s), {} criteria",
            record.id,
            units.len(),
            self.rules.len()
        );

        let outcomes = {
            let record = &record;
            let futures = units.into_iter().map(|key| self.evaluate_unit(record, key, &history, &log, token));
            join_all(futures).await
        };

        let mut cancelled = false;
        for outcome in outcomes {
            let outcome = outcome?;
            cancelled |= outcome.cancelled;
            self.apply(&mut record, outcome, &log);
        }
        if cancelled {
            log.push(
                Diagnostic::warning(ACMG0402, "evaluation cancelled; partial results kept")
                    .with_subject(record.id.clone()),
            );
        }

        log::debug!(
            "record {} done: {} history lookup(s), {} diagnostic(s)",
            record.id,
            history.memoized(),
            log.len()
        );
        Ok(SessionReport {
            record,
            diagnostics: log.into_vec(),
            cancelled,
        })
    }

    /// Evaluate independent records concurrently, one task per record;
    /// reports come back in input order
    pub async fn evaluate_all(&self, records: Vec<VariantRecord>) -> Vec<Result<SessionReport>> {
        let handles: Vec<_> = records
            .into_iter()
            .map(|record| {
                let session = self.clone();
                tokio::spawn(async move { session.evaluate(record).await })
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            reports.push(match handle.await {
                Ok(report) => report,
                Err(err) => Err(AcmgError::system(ACMG0400, format!("evaluation task failed: {err}"))),
            });
        }
        reports
    }

    fn units(&self, record: &VariantRecord) -> Vec<UnitKey> {
        let mut units = Vec::new();
        for (gene_index, gene) in record.genes.iter().enumerate() {
            for (position, (source, phenotype, _)) in gene.phenotypes.iter().enumerate() {
                if position > 0 && !self.config.evaluate_all_phenotypes {
                    break;
                }
                units.push(UnitKey {
                    gene: gene_index,
                    source,
                    phenotype,
                });
            }
        }
        units
    }

    async fn evaluate_unit(
        &self,
        record: &VariantRecord,
        key: UnitKey,
        history: &HistoryAdapter,
        log: &DiagnosticLog,
        token: &CancellationToken,
    ) -> Result<UnitOutcome> {
        let gene = record
            .genes
            .get(key.gene)
            .ok_or_else(|| AcmgError::system(ACMG0400, "gene index out of range"))?;
        let phenotype = gene
            .phenotypes
            .get(key.source)
            .get(key.phenotype)
            .ok_or_else(|| AcmgError::system(ACMG0400, "phenotype index out of range"))?;

        let ctx = UnitContext::new(
            &self.rules,
            &self.config.thresholds,
            history,
            log,
            &token.flag,
            record,
            gene,
            key.source,
            phenotype,
        )?;

        let mut results = IndexMap::new();
        let mut cancelled = false;
        for definition in self.rules.ordered() {
            if ctx.is_cancelled() {
                log::debug!("{}: cancelled before {}", ctx.subject(), definition.code);
                cancelled = true;
                break;
            }
            let outcome = self.engine.evaluate_criterion(definition, &ctx).await;
            results.insert(definition.code.clone(), outcome.outcome);
        }

        Ok(UnitOutcome {
            key,
            results,
            cancelled,
        })
    }

    /// Write one unit's outcomes into the record and classify the phenotype
    fn apply(&self, record: &mut VariantRecord, outcome: UnitOutcome, log: &DiagnosticLog) {
        let Some(gene) = record.genes.get_mut(outcome.key.gene) else {
            return;
        };
        let symbol = gene.gene.clone();
        let Some(entry) = gene
            .phenotypes
            .get_mut(outcome.key.source)
            .get_mut(outcome.key.phenotype)
        else {
            return;
        };

        let block = &mut entry.acmg;
        for (code, calculated) in outcome.results {
            block.criteria.entry(code).or_default().record(calculated);
        }
        if outcome.cancelled {
            return;
        }

        let aggregated = aggregate(
            block.criteria.iter().map(|(code, result)| (code.as_str(), result)),
            &self.rules,
            &self.config.aggregation,
        );
        match aggregated {
            Ok((classification, tally)) => {
                log::debug!(
                    "{symbol}/{}:{} -> {} (pathogenic {}, benign {})",
                    outcome.key.source,
                    entry.phenotype,
                    classification.abbreviation(),
                    tally.pathogenic,
                    tally.benign
                );
                block.calculated_classification = Some(classification);
                block.classification_error = None;
            }
            Err(err) => {
                log.push(
                    Diagnostic::error(ACMG0206, format!("{err}; classified as US"))
                        .with_subject(format!("{symbol}/{}:{}", outcome.key.source, entry.phenotype)),
                );
                block.calculated_classification = Some(Classification::UncertainSignificance);
                block.classification_error = Some(err.to_string());
            }
        }
    }
}

//! Evaluation context for one (gene, phenotype) unit
//!
//! The context owns read-only views of the record, gene, annotation and
//! phenotype documents, the effective thresholds, and the per-unit results
//! that later criteria may read (`PVS1.match`). Interior state sits behind
//! `parking_lot` mutexes so the context can be shared across `.await` points.

use crate::definition::{Level, RuleSet};
use crate::history::HistoryAdapter;
use indexmap::IndexMap;
use octofhir_acmg_ast::VariableRef;
use octofhir_acmg_diagnostics::{ACMG0201, ACMG0400, AcmgError, Diagnostic, DiagnosticLog, Result};
use octofhir_acmg_model::{
    CriterionState, GeneEntry, Inheritance, PhenotypeEntry, PhenotypeSource, Strength, VariantRecord,
};
use octofhir_acmg_types::Value;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// Names every unit defines from the record, gene and phenotype
pub const BUILTIN_NAMES: &[&str] = &[
    "variant_id",
    "chromosome",
    "position",
    "ref",
    "alt",
    "zygosity",
    "read_depth",
    "frequency",
    "variant_type",
    "gene",
    "maf",
    "phenotype",
    "inheritance_mode",
    "phenotype_source",
    "dominant",
    "recessive",
    "annotations",
];

/// Progress of a criterion within the current unit
#[derive(Debug, Clone, Default)]
pub struct CriterionRun {
    pub levels: HashMap<Level, bool>,
    pub matched: bool,
    pub state: Option<CriterionState>,
    pub strength: Option<Strength>,
}

impl CriterionRun {
    fn attribute(&self, name: &str) -> Value {
        match name {
            "match" => Value::Bool(self.matched),
            "state" => self.state.map_or(Value::None, |s| Value::Integer(s.code().into())),
            "strength" => self.strength.map_or(Value::None, |s| Value::Integer(s.code().into())),
            level => Value::Bool(
                Level::from_name(level)
                    .and_then(|level| self.levels.get(&level).copied())
                    .unwrap_or(false),
            ),
        }
    }
}

/// Identifies a phenotype entry inside a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitKey {
    pub gene: usize,
    pub source: PhenotypeSource,
    pub phenotype: usize,
}

pub struct UnitContext<'a> {
    pub(crate) rules: &'a RuleSet,
    overrides: &'a IndexMap<String, Value>,
    pub(crate) history: &'a HistoryAdapter,
    diagnostics: &'a DiagnosticLog,
    cancelled: &'a AtomicBool,
    subject: String,
    record: Value,
    gene: Value,
    annotations: Value,
    phenotype: Value,
    builtins: IndexMap<&'static str, Value>,
    vars: Mutex<HashMap<String, Value>>,
    runs: Mutex<HashMap<String, CriterionRun>>,
    unresolved: Mutex<HashSet<String>>,
    criterion: Mutex<Option<String>>,
    captures: Mutex<Vec<IndexMap<String, Value>>>,
}

fn view<T: Serialize>(document: &T, drop: &[&str]) -> Result<Value> {
    let mut json = serde_json::to_value(document)
        .map_err(|e| AcmgError::system(ACMG0400, format!("cannot build evaluation view: {e}")))?;
    if let serde_json::Value::Object(map) = &mut json {
        for key in drop {
            map.remove(*key);
        }
    }
    Ok(Value::from_json(&json))
}

impl<'a> UnitContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: &'a RuleSet,
        overrides: &'a IndexMap<String, Value>,
        history: &'a HistoryAdapter,
        diagnostics: &'a DiagnosticLog,
        cancelled: &'a AtomicBool,
        record: &VariantRecord,
        gene: &GeneEntry,
        source: PhenotypeSource,
        phenotype: &PhenotypeEntry,
    ) -> Result<Self> {
        let record_view = view(record, &["genes"])?;
        let gene_view = view(gene, &["annotations", "phenotypes"])?;
        let annotations = view(&gene.annotations, &[])?;
        let phenotype_view = view(phenotype, &["acmg"])?;

        let inheritance = phenotype.inheritance();
        let maf = gene
            .annotations
            .maf
            .as_ref()
            .and_then(|m| m.max)
            .map_or(Value::None, Value::Decimal);

        let mut builtins = IndexMap::new();
        builtins.insert("variant_id", Value::from(record.id.as_str()));
        builtins.insert("chromosome", Value::from(record.chromosome.clone()));
        builtins.insert("position", Value::from(record.position));
        builtins.insert("ref", Value::from(record.reference()));
        builtins.insert("alt", Value::from(record.alt()));
        builtins.insert("zygosity", Value::from(record.zygosity.clone()));
        builtins.insert("read_depth", Value::from(record.read_depth));
        builtins.insert("frequency", Value::from(record.frequency));
        builtins.insert("variant_type", Value::from(record.variant_type.clone()));
        builtins.insert("gene", Value::from(gene.gene.as_str()));
        builtins.insert("maf", maf);
        builtins.insert("phenotype", Value::from(phenotype.phenotype.as_str()));
        builtins.insert("inheritance_mode", Value::from(phenotype.inheritance_mode.clone()));
        builtins.insert("phenotype_source", Value::from(source.as_str()));
        builtins.insert("dominant", Value::Bool(inheritance == Inheritance::Dominant));
        builtins.insert("recessive", Value::Bool(inheritance == Inheritance::Recessive));
        builtins.insert("annotations", annotations.clone());

        Ok(Self {
            rules,
            overrides,
            history,
            diagnostics,
            cancelled,
            subject: format!("{}/{}:{}", gene.gene, source, phenotype.phenotype),
            record: record_view,
            gene: gene_view,
            annotations,
            phenotype: phenotype_view,
            builtins,
            vars: Mutex::new(HashMap::new()),
            runs: Mutex::new(HashMap::new()),
            unresolved: Mutex::new(HashSet::new()),
            criterion: Mutex::new(None),
            captures: Mutex::new(Vec::new()),
        })
    }

    /// `gene/source:phenotype`
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Criterion whose conditions are being evaluated
    pub fn current_criterion(&self) -> Option<String> {
        self.criterion.lock().clone()
    }

    pub(crate) fn enter_criterion(&self, code: &str) {
        *self.criterion.lock() = Some(code.to_string());
        self.runs.lock().insert(code.to_string(), CriterionRun::default());
    }

    pub(crate) fn leave_criterion(&self) {
        *self.criterion.lock() = None;
    }

    fn tag(&self, diagnostic: Diagnostic) -> Diagnostic {
        let diagnostic = diagnostic.with_subject(self.subject.clone());
        match self.current_criterion() {
            Some(code) if diagnostic.criterion.is_none() => diagnostic.with_criterion(code),
            _ => diagnostic,
        }
    }

    /// Record a diagnostic tagged with this unit and the running criterion
    pub fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.push(self.tag(diagnostic));
    }

    /// Record a diagnostic once per record: later reports of the same `key`
    /// for the same criterion, from any unit, are dropped
    pub fn report_once(&self, key: &str, diagnostic: Diagnostic) {
        let diagnostic = self.tag(diagnostic);
        let criterion = diagnostic.criterion.clone().unwrap_or_default();
        self.diagnostics.push_once(format!("{criterion}:{key}"), diagnostic);
    }

    pub(crate) fn set_level(&self, code: &str, level: Level, value: bool) {
        let mut runs = self.runs.lock();
        let run = runs.entry(code.to_string()).or_default();
        if level == Level::Match {
            run.matched = value;
        } else {
            run.levels.insert(level, value);
        }
    }

    pub(crate) fn finish_run(&self, code: &str, state: CriterionState, strength: Strength) {
        let mut runs = self.runs.lock();
        let run = runs.entry(code.to_string()).or_default();
        run.state = Some(state);
        run.strength = Some(strength);
    }

    pub fn run(&self, code: &str) -> Option<CriterionRun> {
        self.runs.lock().get(code).cloned()
    }

    /// Threshold value: configuration overrides first, then rule-set constants
    pub fn threshold(&self, name: &str) -> Option<&Value> {
        self.overrides.get(name).or_else(|| self.rules.consts().get(name))
    }

    pub(crate) fn cached_var(&self, name: &str) -> Option<Value> {
        self.vars.lock().get(name).cloned()
    }

    pub(crate) fn cache_var(&self, name: &str, value: Value) {
        self.vars.lock().insert(name.to_string(), value);
    }

    /// Criterion reference (`PVS1.match`); `None` when the name is not one
    pub(crate) fn criterion_attribute(&self, var: &VariableRef) -> Option<Value> {
        if !var.is_dotted() || !self.rules.is_criterion(var.head()) {
            return None;
        }
        let attribute = var.path.get(1).map_or("", |segment| segment.as_str());
        let value = match self.runs.lock().get(var.head()) {
            Some(run) => run.attribute(attribute),
            None => CriterionRun::default().attribute(attribute),
        };
        Some(value)
    }

    /// Resolve a path against the record views: builtins, then the phenotype,
    /// annotation, gene and record documents
    pub(crate) fn lookup_record(&self, var: &VariableRef) -> Option<Value> {
        let head = var.head();
        let rest = &var.path[1..];
        let walk = |root: &Value| {
            rest.iter()
                .try_fold(root, |current, segment| current.get(segment.as_str()))
                .cloned()
                .unwrap_or(Value::None)
        };

        if let Some(value) = self.builtins.get(head) {
            return Some(walk(value));
        }
        [&self.phenotype, &self.annotations, &self.gene, &self.record]
            .into_iter()
            .find_map(|document| document.get(head))
            .map(walk)
    }

    /// Start recording resolved values for one leaf expression
    pub(crate) fn begin_capture(&self) {
        self.captures.lock().push(IndexMap::new());
    }

    pub(crate) fn end_capture(&self) -> IndexMap<String, Value> {
        self.captures.lock().pop().unwrap_or_default()
    }

    /// Record a resolved variable or call result for the innermost leaf
    pub(crate) fn capture(&self, key: String, value: Value) {
        if let Some(frame) = self.captures.lock().last_mut() {
            frame.entry(key).or_insert(value);
        }
    }

    /// A name nothing resolves: `None`, reported once per unit
    pub(crate) fn unresolved(&self, var: &VariableRef) -> Value {
        let name = var.name();
        if self.unresolved.lock().insert(name.clone()) {
            self.report(Diagnostic::info(
                ACMG0201,
                format!("`{name}` is not defined for this record; treated as None"),
            ));
        }
        Value::None
    }
}

//! History store implementations
//!
//! This module provides a no-op store and an in-memory store over a list of
//! prior classified-variant documents.

use crate::history::{FieldFilter, FilterSpec, HistoryQuery, HistoryStore, HistoryStoreError, RelationshipFilter};
use crate::record::Inheritance;
use async_trait::async_trait;
use octofhir_acmg_types::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

/// NoOp history store, every lookup counts zero
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHistoryStore;

impl NoOpHistoryStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HistoryStore for NoOpHistoryStore {
    async fn count(&self, _query: &HistoryQuery) -> Result<u64, HistoryStoreError> {
        Ok(0)
    }
}

/// History documents held in memory
///
/// Each document is a flat-ish JSON object describing one prior variant
/// (`variant_id`, `gene`, `protein_change`, `acmg_classification`, ...).
/// Field names in filters may be dotted paths. Relationship filters read:
/// - `in_cis_variants` / `in_trans_variants`: ids of variants linked to this one
/// - `acmg_classification`: the prior variant's label
/// - `inheritance_mode`: the phenotype it was classified under
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistoryStore {
    documents: Vec<Value>,
}

impl InMemoryHistoryStore {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    /// Accepts a JSON array of documents or an object with a `variants` array
    pub fn from_json(json: &serde_json::Value) -> Result<Self, HistoryStoreError> {
        let items = match json {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(map) => match map.get("variants") {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(HistoryStoreError::Rejected(
                        "expected an array or an object with a `variants` array".to_string(),
                    ));
                }
            },
            _ => {
                return Err(HistoryStoreError::Rejected(
                    "history document must be a JSON array".to_string(),
                ));
            }
        };
        Ok(Self::new(items.iter().map(Value::from_json).collect()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, HistoryStoreError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| HistoryStoreError::Rejected(e.to_string()))?;
        Self::from_json(&json)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HistoryStoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HistoryStoreError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn push(&mut self, document: Value) {
        self.documents.push(document);
    }

    fn matches(&self, document: &Value, query: &HistoryQuery) -> bool {
        query.filters().iter().all(|filter| field_matches(document, filter))
            && query
                .relationships()
                .iter()
                .all(|relationship| relationship_matches(document, relationship, query.anchor_variant()))
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn count(&self, query: &HistoryQuery) -> Result<u64, HistoryStoreError> {
        let matching = self.documents.iter().filter(|doc| self.matches(doc, query));

        let count = if query.distinct_on().is_empty() {
            matching.count()
        } else {
            matching
                .map(|doc| {
                    query
                        .distinct_on()
                        .iter()
                        .map(|field| lookup(doc, field).to_string())
                        .collect::<Vec<_>>()
                        .join("\u{1f}")
                })
                .collect::<HashSet<_>>()
                .len()
        };
        log::trace!("in-memory history: {query} -> {count}");
        Ok(count as u64)
    }
}

fn lookup<'a>(document: &'a Value, path: &str) -> &'a Value {
    const MISSING: &Value = &Value::None;
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
        .unwrap_or(MISSING)
}

fn equals(field: &Value, expected: &Value) -> bool {
    match (field, expected) {
        (_, Value::List(options)) => match field {
            Value::List(items) => items.iter().any(|item| options.contains(item)),
            _ => options.contains(field),
        },
        (Value::List(items), _) => items.contains(expected),
        _ => field == expected,
    }
}

fn contains_any(field: &Value, needles: &[Value]) -> bool {
    let hit = |candidate: &Value| {
        needles.iter().any(|needle| match (candidate, needle) {
            (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
            _ => candidate == needle,
        })
    };
    match field {
        Value::List(items) => items.iter().any(hit),
        other => hit(other),
    }
}

fn field_matches(document: &Value, filter: &FieldFilter) -> bool {
    let value = lookup(document, &filter.field);
    match &filter.spec {
        FilterSpec::Eq(expected) => equals(value, expected),
        FilterSpec::Contains(needles) => contains_any(value, needles),
        FilterSpec::Ne(expected) => !equals(value, expected),
        FilterSpec::Lte(bound) => matches!(
            value.partial_compare(bound),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterSpec::Gte(bound) => matches!(
            value.partial_compare(bound),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn relationship_matches(document: &Value, relationship: &RelationshipFilter, anchor: Option<&Value>) -> bool {
    let linked = |field: &str, classes: &[Value]| {
        let Some(anchor) = anchor else {
            return false;
        };
        equals(lookup(document, field), anchor)
            && (classes.is_empty() || equals(lookup(document, "acmg_classification"), &Value::List(classes.to_vec())))
    };
    match relationship {
        RelationshipFilter::InCisSameGeneClassification(classes) => linked("in_cis_variants", classes),
        RelationshipFilter::InTransSameGeneClassification(classes) => linked("in_trans_variants", classes),
        RelationshipFilter::IsDominant(flag) => {
            let dominant = lookup(document, "inheritance_mode")
                .as_str()
                .is_some_and(|mode| Inheritance::from_mode(mode) == Inheritance::Dominant);
            dominant == *flag
        }
    }
}

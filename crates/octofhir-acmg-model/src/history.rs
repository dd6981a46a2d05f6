//! History store abstraction
//!
//! `history_count(...)` arguments are turned into a [`HistoryQuery`] before any
//! backend sees them. Operator suffixes (`field__ne`, `field__contains`, ...) are
//! parsed once into [`FilterSpec`] values, so an unknown operator or a list where a
//! scalar is required fails at construction instead of inside a backend.

use async_trait::async_trait;
use octofhir_acmg_types::Value;
use std::fmt;
use thiserror::Error;

/// Backend holding previously classified variants
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Number of prior variants (or distinct groups) matching the query
    async fn count(&self, query: &HistoryQuery) -> Result<u64, HistoryStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum HistoryStoreError {
    #[error("history backend unavailable: {0}")]
    Unavailable(String),

    #[error("history query rejected: {0}")]
    Rejected(String),

    #[error("internal history error: {0}")]
    Internal(String),
}

/// Construction errors for [`HistoryQuery`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryQueryError {
    #[error("unknown filter operator `{operator}` in `{key}`")]
    UnknownOperator { key: String, operator: String },

    #[error("filter `{key}` expects {expected}, got {actual}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("filter `{0}` given more than once")]
    Duplicate(String),

    #[error("filter key is empty")]
    EmptyKey,
}

/// Comparison applied to one field of the history documents
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    /// Field equals the value; a list value means "equals any of"
    Eq(Value),
    /// Field (text or list) contains any of the values
    Contains(Vec<Value>),
    Ne(Value),
    Lte(Value),
    Gte(Value),
}

impl FilterSpec {
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Eq(_) => "",
            Self::Contains(_) => "contains",
            Self::Ne(_) => "ne",
            Self::Lte(_) => "lte",
            Self::Gte(_) => "gte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub spec: FilterSpec,
}

/// Filters whose meaning depends on the store's own linkage between variants
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipFilter {
    /// Variant in cis with the queried one, same gene, classification in the set
    InCisSameGeneClassification(Vec<Value>),
    /// Variant in trans with the queried one, same gene, classification in the set
    InTransSameGeneClassification(Vec<Value>),
    /// Variant observed under a dominant (or, with `false`, non-dominant) phenotype
    IsDominant(bool),
}

impl RelationshipFilter {
    pub fn key(&self) -> &'static str {
        match self {
            Self::InCisSameGeneClassification(_) => "__in_cis_variant_same_gene_classification",
            Self::InTransSameGeneClassification(_) => "__in_trans_variant_same_gene_classification",
            Self::IsDominant(_) => "__is_dominant",
        }
    }
}

const OPERATORS: &[&str] = &["contains", "ne", "lte", "gte"];

const SPECIAL_KEYS: &[&str] = &[
    "__distinct",
    "__is_dominant",
    "__in_cis_variant_same_gene_classification",
    "__in_trans_variant_same_gene_classification",
];

/// A validated history lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryQuery {
    filters: Vec<FieldFilter>,
    relationships: Vec<RelationshipFilter>,
    distinct_on: Vec<String>,
}

impl HistoryQuery {
    /// Build a query from resolved `key=value` call arguments
    pub fn from_arguments<I, K>(arguments: I) -> Result<Self, HistoryQueryError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut query = Self::default();
        for (key, value) in arguments {
            query.add_argument(key.as_ref(), value)?;
        }
        query
            .filters
            .sort_by(|a, b| (a.field.as_str(), a.spec.operator()).cmp(&(b.field.as_str(), b.spec.operator())));
        query.relationships.sort_by_key(RelationshipFilter::key);
        Ok(query)
    }

    /// Check the form of an argument key before any value is known
    pub fn check_key(key: &str) -> Result<(), HistoryQueryError> {
        if key.is_empty() {
            return Err(HistoryQueryError::EmptyKey);
        }
        if SPECIAL_KEYS.contains(&key) {
            return Ok(());
        }
        match key.rsplit_once("__") {
            Some((field, operator)) if field.is_empty() || !OPERATORS.contains(&operator) => {
                Err(HistoryQueryError::UnknownOperator {
                    key: key.to_string(),
                    operator: operator.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn add_argument(&mut self, key: &str, value: Value) -> Result<(), HistoryQueryError> {
        if key.is_empty() {
            return Err(HistoryQueryError::EmptyKey);
        }

        match key {
            "__distinct" => {
                if !self.distinct_on.is_empty() {
                    return Err(HistoryQueryError::Duplicate(key.to_string()));
                }
                self.distinct_on = string_list(key, value)?;
                return Ok(());
            }
            "__is_dominant" => {
                return self.add_relationship(key, RelationshipFilter::IsDominant(value.is_truthy()));
            }
            "__in_cis_variant_same_gene_classification" => {
                let classes = value_list(value);
                return self.add_relationship(key, RelationshipFilter::InCisSameGeneClassification(classes));
            }
            "__in_trans_variant_same_gene_classification" => {
                let classes = value_list(value);
                return self.add_relationship(key, RelationshipFilter::InTransSameGeneClassification(classes));
            }
            _ => {}
        }

        let (field, spec) = match key.rsplit_once("__") {
            None => (key, FilterSpec::Eq(value)),
            Some((field, operator)) => {
                if field.is_empty() {
                    return Err(HistoryQueryError::UnknownOperator {
                        key: key.to_string(),
                        operator: operator.to_string(),
                    });
                }
                let spec = match operator {
                    "contains" => FilterSpec::Contains(value_list(value)),
                    "ne" => FilterSpec::Ne(scalar(key, value)?),
                    "lte" => FilterSpec::Lte(scalar(key, value)?),
                    "gte" => FilterSpec::Gte(scalar(key, value)?),
                    other => {
                        return Err(HistoryQueryError::UnknownOperator {
                            key: key.to_string(),
                            operator: other.to_string(),
                        });
                    }
                };
                (field, spec)
            }
        };

        let duplicate = self
            .filters
            .iter()
            .any(|f| f.field == field && f.spec.operator() == spec.operator());
        if duplicate {
            return Err(HistoryQueryError::Duplicate(key.to_string()));
        }
        self.filters.push(FieldFilter {
            field: field.to_string(),
            spec,
        });
        Ok(())
    }

    fn add_relationship(&mut self, key: &str, filter: RelationshipFilter) -> Result<(), HistoryQueryError> {
        if self.relationships.iter().any(|r| r.key() == filter.key()) {
            return Err(HistoryQueryError::Duplicate(key.to_string()));
        }
        self.relationships.push(filter);
        Ok(())
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn relationships(&self) -> &[RelationshipFilter] {
        &self.relationships
    }

    pub fn distinct_on(&self) -> &[String] {
        &self.distinct_on
    }

    /// The variant the query is about: the `variant_id` equality or exclusion value
    pub fn anchor_variant(&self) -> Option<&Value> {
        self.filters.iter().find_map(|f| match &f.spec {
            FilterSpec::Eq(v) | FilterSpec::Ne(v) if f.field == "variant_id" => Some(v),
            _ => None,
        })
    }

    /// Canonical text used for memoization; argument order does not matter
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

fn scalar(key: &str, value: Value) -> Result<Value, HistoryQueryError> {
    match value {
        Value::List(_) | Value::Map(_) => Err(HistoryQueryError::InvalidValue {
            key: key.to_string(),
            expected: "a scalar",
            actual: value.type_name(),
        }),
        other => Ok(other),
    }
}

fn value_list(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::None => Vec::new(),
        other => vec![other],
    }
}

fn string_list(key: &str, value: Value) -> Result<Vec<String>, HistoryQueryError> {
    value_list(value)
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(HistoryQueryError::InvalidValue {
                key: key.to_string(),
                expected: "field names",
                actual: other.type_name(),
            }),
        })
        .collect()
}

fn write_values(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    write!(f, "{}", Value::List(values.to_vec()))
}

impl fmt::Display for HistoryQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history_count(")?;
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            Ok(())
        };

        for filter in &self.filters {
            sep(f)?;
            match &filter.spec {
                FilterSpec::Eq(v) => write!(f, "{}={v}", filter.field)?,
                FilterSpec::Contains(values) => {
                    write!(f, "{}__contains=", filter.field)?;
                    write_values(f, values)?;
                }
                FilterSpec::Ne(v) => write!(f, "{}__ne={v}", filter.field)?,
                FilterSpec::Lte(v) => write!(f, "{}__lte={v}", filter.field)?,
                FilterSpec::Gte(v) => write!(f, "{}__gte={v}", filter.field)?,
            }
        }
        for relationship in &self.relationships {
            sep(f)?;
            write!(f, "{}=", relationship.key())?;
            match relationship {
                RelationshipFilter::InCisSameGeneClassification(values)
                | RelationshipFilter::InTransSameGeneClassification(values) => write_values(f, values)?,
                RelationshipFilter::IsDominant(flag) => write!(f, "{}", Value::Bool(*flag))?,
            }
        }
        if !self.distinct_on.is_empty() {
            sep(f)?;
            let names: Vec<Value> = self.distinct_on.iter().map(|s| Value::from(s.as_str())).collect();
            write!(f, "__distinct=")?;
            write_values(f, &names)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(pairs: Vec<(&str, Value)>) -> Result<HistoryQuery, HistoryQueryError> {
        HistoryQuery::from_arguments(pairs)
    }

    #[test]
    fn test_operator_suffixes() {
        let query = args(vec![
            ("gene", Value::from("DIABLO")),
            ("impact__contains", Value::from(vec!["missense"])),
            ("protein_change__ne", Value::from("p.Ile59Val")),
            ("mes_diff__lte", Value::None),
            ("__distinct", Value::from(vec!["protein_change"])),
        ])
        .unwrap();

        let kinds: Vec<(&str, &str)> = query
            .filters()
            .iter()
            .map(|f| (f.field.as_str(), f.spec.operator()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("gene", ""),
                ("impact", "contains"),
                ("mes_diff", "lte"),
                ("protein_change", "ne"),
            ]
        );
        assert_eq!(query.distinct_on(), ["protein_change".to_string()]);
    }

    #[test]
    fn test_check_key() {
        assert!(HistoryQuery::check_key("protein_change__ne").is_ok());
        assert!(HistoryQuery::check_key("__in_cis_variant_same_gene_classification").is_ok());
        assert!(HistoryQuery::check_key("gene").is_ok());
        assert_eq!(
            HistoryQuery::check_key("codon__near"),
            Err(HistoryQueryError::UnknownOperator {
                key: "codon__near".to_string(),
                operator: "near".to_string(),
            })
        );
        assert!(HistoryQuery::check_key("__similar").is_err());
        assert_eq!(HistoryQuery::check_key(""), Err(HistoryQueryError::EmptyKey));
    }

    #[test]
    fn test_cache_key_ignores_argument_order() {
        let a = args(vec![("gene", Value::from("CFTR")), ("codon", Value::Integer(59))]).unwrap();
        let b = args(vec![("codon", Value::Integer(59)), ("gene", Value::from("CFTR"))]).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "history_count(codon=59, gene='CFTR')");
    }

    #[test]
    fn test_relationship_filters() {
        let query = args(vec![
            ("__is_dominant", Value::Bool(true)),
            ("__in_trans_variant_same_gene_classification", Value::from(vec!["LP", "P"])),
        ])
        .unwrap();
        assert_eq!(query.relationships().len(), 2);
        assert_eq!(
            query.cache_key(),
            "history_count(__in_trans_variant_same_gene_classification=['LP', 'P'], __is_dominant=True)"
        );
    }

    #[test]
    fn test_invalid_filters_fail_at_construction() {
        assert!(matches!(
            args(vec![("codon__between", Value::Integer(1))]),
            Err(HistoryQueryError::UnknownOperator { .. })
        ));
        assert!(matches!(
            args(vec![("position__gte", Value::from(vec![1i64, 2]))]),
            Err(HistoryQueryError::InvalidValue { .. })
        ));
        assert!(matches!(
            args(vec![("gene", Value::from("A")), ("gene", Value::from("B"))]),
            Err(HistoryQueryError::Duplicate(_))
        ));
        assert!(matches!(
            args(vec![("__distinct", Value::Integer(1))]),
            Err(HistoryQueryError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_anchor_variant() {
        let query = args(vec![("variant_id__ne", Value::from("V1")), ("gene", Value::from("G"))]).unwrap();
        assert_eq!(query.anchor_variant(), Some(&Value::from("V1")));
    }
}

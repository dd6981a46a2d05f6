//! Rule-set documents
//!
//! A rule set declares constants, derived variables and criteria. Every condition
//! is parsed once here; text that fails to parse is kept as an invalid node so the
//! rest of the rule set still loads and the bad condition fails closed.

use crate::context::BUILTIN_NAMES;
use crate::operators::functions::{HISTORY_COUNT, is_known_function};
use crate::order::{criterion_order, variable_dependencies};
use indexmap::IndexMap;
use octofhir_acmg_ast::{Condition, Expression, ParsedExpr, VariableRef};
use octofhir_acmg_diagnostics::{
    ACMG0007, ACMG0100, ACMG0101, ACMG0105, ACMG0106, ACMG0109, ACMG0110, AcmgError, Diagnostic, Result, Severity,
};
use octofhir_acmg_model::{HistoryQuery, Polarity, Strength};
use octofhir_acmg_parser::parse_expression;
use octofhir_acmg_types::Value;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// A condition slot of a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    NotApplicable,
    NeedsManualInput,
    Standalone,
    VeryStrong,
    Strong,
    Moderate,
    Supporting,
    Match,
}

impl Level {
    /// Evaluation order of the state machine; `Match` runs separately
    pub const STATE_ORDER: [Level; 7] = [
        Self::NotApplicable,
        Self::NeedsManualInput,
        Self::Standalone,
        Self::VeryStrong,
        Self::Strong,
        Self::Moderate,
        Self::Supporting,
    ];

    /// Levels that grant a strength when matched, strongest first
    pub const GRADED: [Level; 5] = [
        Self::Standalone,
        Self::VeryStrong,
        Self::Strong,
        Self::Moderate,
        Self::Supporting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::NotApplicable => "not_applicable",
            Self::NeedsManualInput => "needs_manual_input",
            Self::Standalone => "standalone",
            Self::VeryStrong => "very_strong",
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Supporting => "supporting",
            Self::Match => "match",
        }
    }

    /// Rule-set and trace key (`cond_very_strong`)
    pub fn key(self) -> String {
        format!("cond_{}", self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::STATE_ORDER
            .into_iter()
            .chain([Self::Match])
            .find(|level| level.name() == name)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        key.strip_prefix("cond_").and_then(Self::from_name)
    }

    pub fn is_graded(self) -> bool {
        Self::GRADED.contains(&self)
    }

    /// Strength recorded when this level matches; standalone records the top strength
    pub fn strength(self) -> Strength {
        match self {
            Self::Standalone | Self::VeryStrong => Strength::VeryStrong,
            Self::Strong => Strength::Strong,
            Self::Moderate => Strength::Moderate,
            Self::Supporting => Strength::Supporting,
            Self::NotApplicable | Self::NeedsManualInput | Self::Match => Strength::None,
        }
    }

    /// Default nominal level implied by an ACMG code prefix
    pub fn nominal_for_code(code: &str) -> Self {
        match code {
            c if c.starts_with("PVS") => Self::VeryStrong,
            c if c.starts_with("BA") => Self::Standalone,
            c if c.starts_with("PS") || c.starts_with("BS") => Self::Strong,
            c if c.starts_with("PM") => Self::Moderate,
            _ => Self::Supporting,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attributes of another criterion a condition may read (`PVS1.match`)
pub const CRITERION_ATTRIBUTES: &[&str] = &[
    "not_applicable",
    "needs_manual_input",
    "standalone",
    "very_strong",
    "strong",
    "moderate",
    "supporting",
    "match",
    "state",
    "strength",
];

/// A derived variable
#[derive(Debug, Clone)]
pub enum VarDefinition {
    /// Plain dotted path into the record (`annotations.protein_domains`)
    Path(VariableRef),
    /// Value of an expression
    Expr(Condition),
    /// Boolean result of a condition tree
    Cond(Condition),
}

impl VarDefinition {
    pub fn variables(&self) -> Vec<&VariableRef> {
        match self {
            Self::Path(_) => Vec::new(),
            Self::Expr(condition) | Self::Cond(condition) => condition.variables(),
        }
    }

    fn conditions(&self) -> Option<&Condition> {
        match self {
            Self::Path(_) => None,
            Self::Expr(condition) | Self::Cond(condition) => Some(condition),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CriterionDefinition {
    pub code: String,
    pub description: String,
    pub polarity: Polarity,
    /// Nominal (maximum) level, reported while the criterion waits for manual input
    pub nominal: Level,
    conditions: IndexMap<Level, Condition>,
    /// Auxiliary values written to `info`
    pub info: IndexMap<String, Condition>,
    /// Rule-authored warnings: identifier to the condition that raises it
    pub warn: IndexMap<String, Condition>,
}

impl CriterionDefinition {
    pub fn condition(&self, level: Level) -> Option<&Condition> {
        self.conditions.get(&level)
    }

    /// Conditions in state-machine order, then `cond_match`
    pub fn conditions(&self) -> impl Iterator<Item = (Level, &Condition)> {
        Level::STATE_ORDER
            .into_iter()
            .chain([Level::Match])
            .filter_map(|level| self.conditions.get(&level).map(|c| (level, c)))
    }

    /// Every condition, info expression and warning condition of this criterion
    pub fn all_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions
            .values()
            .chain(self.info.values())
            .chain(self.warn.values())
    }

    pub fn variables(&self) -> Vec<&VariableRef> {
        self.all_conditions().flat_map(Condition::variables).collect()
    }
}

/// A loaded, validated rule set
#[derive(Debug, Clone)]
pub struct RuleSet {
    consts: IndexMap<String, Value>,
    warnings: IndexMap<String, String>,
    vars: IndexMap<String, VarDefinition>,
    criteria: IndexMap<String, CriterionDefinition>,
    order: Vec<usize>,
}

// === Raw document ===

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuleSet {
    #[serde(default)]
    consts: IndexMap<String, Value>,
    #[serde(default)]
    warnings: IndexMap<String, String>,
    #[serde(default)]
    vars: IndexMap<String, RawVar>,
    #[serde(default)]
    criteria: IndexMap<String, RawCriterion>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVar {
    Path(String),
    Expr { expr: String },
    Cond { cond: RawCondition },
}

#[derive(Debug, Deserialize)]
struct RawCriterion {
    #[serde(default)]
    description: String,
    #[serde(default)]
    polarity: Option<Polarity>,
    #[serde(default)]
    strength: Option<String>,
    #[serde(default)]
    info: IndexMap<String, String>,
    #[serde(default)]
    warn: IndexMap<String, RawCondition>,
    #[serde(flatten)]
    conditions: IndexMap<String, RawCondition>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Flag(bool),
    Text(String),
    List(Vec<RawCondition>),
    Node(RawNode),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    #[serde(default)]
    and: Option<Vec<RawCondition>>,
    #[serde(default)]
    or: Option<Vec<RawCondition>>,
}

/// Parse condition text, keeping failures as an invalid node
pub fn parse_condition_text(source: &str) -> Condition {
    match parse_expression(source) {
        Ok(expr) => Condition::Expr(ParsedExpr {
            source: source.to_string(),
            expr,
        }),
        Err(error) => Condition::Invalid {
            source: source.to_string(),
            error,
        },
    }
}

fn build_condition(raw: RawCondition, criterion: &str) -> Result<Condition> {
    Ok(match raw {
        RawCondition::Flag(flag) => Condition::Flag(flag),
        RawCondition::Text(text) => parse_condition_text(&text),
        RawCondition::List(items) => Condition::All(build_conditions(items, criterion)?),
        RawCondition::Node(RawNode { and: Some(items), or: None }) => {
            Condition::All(build_conditions(items, criterion)?)
        }
        RawCondition::Node(RawNode { and: None, or: Some(items) }) => {
            Condition::Any(build_conditions(items, criterion)?)
        }
        RawCondition::Node(_) => {
            return Err(AcmgError::definition_in(
                ACMG0007,
                criterion,
                "a condition node needs exactly one of `and` / `or`",
            ));
        }
    })
}

fn build_conditions(items: Vec<RawCondition>, criterion: &str) -> Result<Vec<Condition>> {
    items
        .into_iter()
        .map(|item| build_condition(item, criterion))
        .collect()
}

impl RuleSet {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let raw: RawRuleSet = serde_yaml::from_str(text)
            .map_err(|e| AcmgError::definition(ACMG0100, format!("invalid rule set: {e}")))?;
        Self::from_raw(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    fn from_raw(raw: RawRuleSet) -> Result<Self> {
        let mut vars = IndexMap::new();
        for (name, var) in raw.vars {
            if raw.consts.contains_key(&name) || raw.criteria.contains_key(&name) {
                return Err(AcmgError::definition_in(
                    ACMG0109,
                    name.as_str(),
                    format!("`{name}` is defined more than once"),
                ));
            }
            let definition = match var {
                RawVar::Path(path) => VarDefinition::Path(VariableRef::dotted(path.trim())),
                RawVar::Expr { expr } => VarDefinition::Expr(parse_condition_text(&expr)),
                RawVar::Cond { cond } => VarDefinition::Cond(build_condition(cond, &name)?),
            };
            vars.insert(name, definition);
        }

        let mut criteria = IndexMap::new();
        for (code, raw_criterion) in raw.criteria {
            let criterion = Self::build_criterion(&code, raw_criterion)?;
            criteria.insert(code, criterion);
        }

        let mut rules = Self {
            consts: raw.consts,
            warnings: raw.warnings,
            vars,
            criteria,
            order: Vec::new(),
        };
        rules.check_references()?;
        variable_dependencies(&rules)?;
        rules.order = criterion_order(&rules)?;
        log::debug!(
            "loaded rule set: {} criteria, {} variables, {} constants",
            rules.criteria.len(),
            rules.vars.len(),
            rules.consts.len()
        );
        Ok(rules)
    }

    fn build_criterion(code: &str, raw: RawCriterion) -> Result<CriterionDefinition> {
        let polarity = match raw.polarity.or_else(|| Polarity::from_code(code)) {
            Some(polarity) => polarity,
            None => {
                return Err(AcmgError::definition_in(
                    ACMG0100,
                    code,
                    "polarity is required when the code does not start with `P` or `B`",
                ));
            }
        };

        let nominal = match raw.strength.as_deref() {
            None => Level::nominal_for_code(code),
            Some(name) => match Level::from_name(name.trim()) {
                Some(level) if level.is_graded() => level,
                _ => {
                    return Err(AcmgError::definition_in(
                        ACMG0100,
                        code,
                        format!("unknown strength `{name}`"),
                    ));
                }
            },
        };

        let mut conditions = IndexMap::new();
        for (key, raw_condition) in raw.conditions {
            let Some(level) = Level::from_key(&key) else {
                let message = if key.starts_with("cond_") {
                    format!("unknown condition level `{key}`")
                } else {
                    format!("unknown criterion field `{key}`")
                };
                let error_code = if key.starts_with("cond_") { ACMG0101 } else { ACMG0100 };
                return Err(AcmgError::definition_in(error_code, code, message));
            };
            conditions.insert(level, build_condition(raw_condition, code)?);
        }

        let info = raw
            .info
            .iter()
            .map(|(name, text)| (name.clone(), parse_condition_text(text)))
            .collect();

        let mut warn = IndexMap::new();
        for (id, raw_condition) in raw.warn {
            warn.insert(id, build_condition(raw_condition, code)?);
        }

        Ok(CriterionDefinition {
            code: code.to_string(),
            description: raw.description,
            polarity,
            nominal,
            conditions,
            info,
            warn,
        })
    }

    /// `<CODE>.<attribute>` references must name a known attribute
    fn check_references(&self) -> Result<()> {
        let mut errors = Vec::new();
        let owners = self
            .criteria
            .values()
            .map(|c| (c.code.as_str(), c.variables()))
            .chain(self.vars.iter().map(|(name, var)| (name.as_str(), var.variables())));

        for (owner, variables) in owners {
            for var in variables {
                if !self.criteria.contains_key(var.head()) || !var.is_dotted() {
                    continue;
                }
                let attribute = var.path.get(1).map_or("", |segment| segment.as_str());
                if var.path.len() != 2 || !CRITERION_ATTRIBUTES.contains(&attribute) {
                    errors.push(AcmgError::definition_in(
                        ACMG0100,
                        owner,
                        format!("`{}` is not a criterion attribute", var.name()),
                    ));
                }
            }
        }

        match AcmgError::from_many(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn consts(&self) -> &IndexMap<String, Value> {
        &self.consts
    }

    /// Warning messages keyed by identifier
    pub fn warnings(&self) -> &IndexMap<String, String> {
        &self.warnings
    }

    /// Message for a warning identifier; undeclared identifiers get a generic text
    pub fn warning_message(&self, id: &str) -> String {
        match self.warnings.get(id) {
            Some(message) => message.clone(),
            None => format!("Warning: {id}"),
        }
    }

    pub fn vars(&self) -> &IndexMap<String, VarDefinition> {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&VarDefinition> {
        self.vars.get(name)
    }

    pub fn criterion(&self, code: &str) -> Option<&CriterionDefinition> {
        self.criteria.get(code)
    }

    pub fn is_criterion(&self, code: &str) -> bool {
        self.criteria.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Criteria in document order
    pub fn criteria(&self) -> impl Iterator<Item = &CriterionDefinition> {
        self.criteria.values()
    }

    /// Criteria in evaluation order (dependencies first)
    pub fn ordered(&self) -> impl Iterator<Item = &CriterionDefinition> {
        self.order.iter().filter_map(|&index| self.criteria.get_index(index).map(|(_, c)| c))
    }

    pub(crate) fn criterion_index(&self, code: &str) -> Option<usize> {
        self.criteria.get_index_of(code)
    }

    /// Names configuration may override: declared constants plus every plain
    /// name a condition reads that is not a derived variable or builtin
    pub fn threshold_names(&self) -> HashSet<&str> {
        let mut names: HashSet<&str> = self.consts.keys().map(String::as_str).collect();
        let referenced = self
            .criteria
            .values()
            .flat_map(CriterionDefinition::variables)
            .chain(self.vars.values().flat_map(VarDefinition::variables));
        for var in referenced {
            let head = var.head();
            if !var.is_dotted() && !self.vars.contains_key(head) && !BUILTIN_NAMES.contains(&head) {
                names.insert(head);
            }
        }
        names
    }

    /// Non-fatal problems: unparsable conditions, unknown function names,
    /// malformed `history_count` filter keys and undeclared warning identifiers
    pub fn lint(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let owned = self
            .criteria
            .values()
            .flat_map(|c| c.all_conditions().map(move |cond| (c.code.as_str(), cond)))
            .chain(
                self.vars
                    .iter()
                    .filter_map(|(name, var)| var.conditions().map(|cond| (name.as_str(), cond))),
            );

        for (owner, condition) in owned {
            for error in condition.errors() {
                for diagnostic in error.to_diagnostics() {
                    out.push(Diagnostic {
                        severity: Severity::Warning,
                        ..diagnostic.with_criterion(owner)
                    });
                }
            }
            let mut found = Vec::new();
            condition.for_each_expr(&mut |expr: &Expression| {
                for call in expr.calls() {
                    let name = call.name.as_str();
                    if !is_known_function(name) {
                        found.push(Diagnostic::warning(ACMG0105, format!("unknown function `{name}`")));
                    } else if name == HISTORY_COUNT {
                        for kwarg in &call.kwargs {
                            if let Err(err) = HistoryQuery::check_key(kwarg.name.as_str()) {
                                found.push(Diagnostic::warning(ACMG0106, format!("{name}: {err}")));
                            }
                        }
                    }
                }
            });
            out.extend(found.into_iter().map(|d| d.with_criterion(owner)));
        }

        for criterion in self.criteria.values() {
            for id in criterion.warn.keys().filter(|id| !self.warnings.contains_key(*id)) {
                out.push(
                    Diagnostic::warning(ACMG0110, format!("warning `{id}` has no message"))
                        .with_criterion(criterion.code.as_str()),
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_acmg_diagnostics::{ACMG0001, ACMG0102};
    use pretty_assertions::assert_eq;

    const RULES: &str = r#"
consts:
  bs1_strong_maf_limit_dominant: 0.0002
vars:
  maf: annotations.maf.max
  is_lof: { cond: { or: ["'frameshift' in impact", "'stop_gained' in impact"] } }
criteria:
  BS1:
    description: Allele frequency greater than expected
    cond_strong:
      - or:
          - and: [dominant, "maf >= bs1_strong_maf_limit_dominant"]
          - and: [recessive, "maf >= bs1_strong_maf_limit_recessive"]
    cond_match: "BS1.strong"
  PVS1:
    cond_very_strong: "is_lof"
  PM4:
    cond_moderate: "not PVS1.match and 'inframe' in impact"
"#;

    #[test]
    fn test_load_rule_set() {
        let rules = RuleSet::from_yaml_str(RULES).unwrap();
        assert_eq!(rules.len(), 3);

        let bs1 = rules.criterion("BS1").unwrap();
        assert_eq!(bs1.polarity, Polarity::Benign);
        assert_eq!(bs1.nominal, Level::Strong);
        let levels: Vec<Level> = bs1.conditions().map(|(level, _)| level).collect();
        assert_eq!(levels, vec![Level::Strong, Level::Match]);
        assert!(matches!(bs1.condition(Level::Strong), Some(Condition::All(_))));
    }

    #[test]
    fn test_dependencies_come_first() {
        let rules = RuleSet::from_yaml_str(RULES).unwrap();
        let order: Vec<&str> = rules.ordered().map(|c| c.code.as_str()).collect();
        assert_eq!(order, vec!["BS1", "PVS1", "PM4"]);
    }

    #[test]
    fn test_threshold_names() {
        let rules = RuleSet::from_yaml_str(RULES).unwrap();
        let names = rules.threshold_names();
        assert!(names.contains("bs1_strong_maf_limit_dominant"));
        assert!(names.contains("bs1_strong_maf_limit_recessive"));
        assert!(!names.contains("maf"));
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = RuleSet::from_yaml_str("criteria:\n  PS1:\n    cond_huge: true\n").unwrap_err();
        assert_eq!(err.code(), ACMG0101);
    }

    #[test]
    fn test_cycle_rejected() {
        let text = "criteria:\n  PS1:\n    cond_strong: PS2.match\n  PS2:\n    cond_strong: PS1.match\n";
        let err = RuleSet::from_yaml_str(text).unwrap_err();
        assert_eq!(err.code(), ACMG0102);
    }

    #[test]
    fn test_bad_attribute_rejected() {
        let text = "criteria:\n  PS1:\n    cond_strong: true\n  PS2:\n    cond_strong: PS1.huge\n";
        let err = RuleSet::from_yaml_str(text).unwrap_err();
        assert_eq!(err.code(), ACMG0100);
    }

    #[test]
    fn test_malformed_condition_kept_and_linted() {
        let text = "criteria:\n  PP3:\n    cond_supporting: \"revel_score >= \"\n    cond_match: \"nope(1)\"\n";
        let rules = RuleSet::from_yaml_str(text).unwrap();
        let pp3 = rules.criterion("PP3").unwrap();
        assert!(!pp3.condition(Level::Supporting).unwrap().is_valid());

        let lint = rules.lint();
        assert_eq!(lint.len(), 2);
        assert!(lint.iter().all(|d| d.is_warning() && d.criterion.as_deref() == Some("PP3")));
        assert!(lint.iter().any(|d| d.code == ACMG0105));
        assert!(!lint.iter().any(|d| d.code == ACMG0001));
    }

    #[test]
    fn test_malformed_history_filter_linted() {
        let text = "criteria:\n  PM1:\n    cond_moderate: \"history_count(gene=gene, codon__near=codon) > 0\"\n";
        let lint = RuleSet::from_yaml_str(text).unwrap().lint();
        assert_eq!(lint.len(), 1);
        assert_eq!(lint[0].code, ACMG0106);
        assert_eq!(lint[0].criterion.as_deref(), Some("PM1"));
        assert!(lint[0].message.contains("near"));
    }

    #[test]
    fn test_rule_warnings_loaded_and_linted() {
        let text = r#"
warnings:
  low_coverage: Read depth below 20; confirm by Sanger
criteria:
  PM2:
    cond_supporting: "maf is None"
    warn:
      low_coverage: "read_depth < 20"
      no_message: "maf is None"
"#;
        let rules = RuleSet::from_yaml_str(text).unwrap();
        let pm2 = rules.criterion("PM2").unwrap();
        assert_eq!(pm2.warn.len(), 2);
        assert_eq!(pm2.all_conditions().count(), 3);
        assert_eq!(rules.warning_message("low_coverage"), "Read depth below 20; confirm by Sanger");
        assert_eq!(rules.warning_message("no_message"), "Warning: no_message");

        let lint = rules.lint();
        assert_eq!(lint.len(), 1);
        assert_eq!(lint[0].code, ACMG0110);
        assert!(lint[0].message.contains("no_message"));
    }

    #[test]
    fn test_level_keys() {
        assert_eq!(Level::from_key("cond_very_strong"), Some(Level::VeryStrong));
        assert_eq!(Level::VeryStrong.key(), "cond_very_strong");
        assert_eq!(Level::Standalone.strength(), Strength::VeryStrong);
        assert_eq!(Level::from_key("very_strong"), None);
    }
}

//! Condition trees as authored in rule sets
//!
//! A condition is either a literal flag, a single expression, or an explicit
//! `and` / `or` node over nested conditions. Text that failed to parse is kept
//! as [`Condition::Invalid`] so that it fails closed at evaluation time instead
//! of preventing the rest of the rule set from loading.

use crate::{Expression, Spanned, VariableRef};
use octofhir_acmg_diagnostics::AcmgError;
use std::fmt;

#[derive(Debug, Clone)]
pub enum Condition {
    /// `true` / `false` written directly (curator flags)
    Flag(bool),
    Expr(ParsedExpr),
    /// Explicit `{and: [...]}` node, or a bare list
    All(Vec<Condition>),
    /// Explicit `{or: [...]}` node
    Any(Vec<Condition>),
    Invalid { source: String, error: AcmgError },
}

/// An expression together with the text it was parsed from
#[derive(Debug, Clone)]
pub struct ParsedExpr {
    pub source: String,
    pub expr: Spanned<Expression>,
}

impl Condition {
    /// Every variable referenced by any expression in this tree
    pub fn variables(&self) -> Vec<&VariableRef> {
        let mut out = Vec::new();
        self.for_each_expr(&mut |expr| out.extend(expr.variables()));
        out
    }

    /// Names of every function called in this tree
    pub fn function_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.for_each_expr(&mut |expr| {
            out.extend(expr.calls().into_iter().map(|c| c.name.as_str()));
        });
        out
    }

    pub fn for_each_expr<'a>(&'a self, f: &mut impl FnMut(&'a Expression)) {
        match self {
            Condition::Flag(_) | Condition::Invalid { .. } => {}
            Condition::Expr(parsed) => f(&parsed.expr.inner),
            Condition::All(items) | Condition::Any(items) => {
                for item in items {
                    item.for_each_expr(f);
                }
            }
        }
    }

    /// Parse errors anywhere in this tree
    pub fn errors(&self) -> Vec<&AcmgError> {
        match self {
            Condition::Invalid { error, .. } => vec![error],
            Condition::All(items) | Condition::Any(items) => {
                items.iter().flat_map(Condition::errors).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Condition], op: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(")")
        }

        match self {
            Condition::Flag(true) => f.write_str("True"),
            Condition::Flag(false) => f.write_str("False"),
            Condition::Expr(parsed) => f.write_str(&parsed.source),
            Condition::All(items) => join(f, items, "and"),
            Condition::Any(items) => join(f, items, "or"),
            Condition::Invalid { source, .. } => f.write_str(source),
        }
    }
}

//! Condition AST for the ACMG rule engine
//!
//! Criterion conditions are parsed once when a rule set is loaded and kept as
//! immutable trees; the evaluator interprets these trees and never re-parses text.

mod condition;
mod expression;
mod literal;
mod operator;

pub use condition::*;
pub use expression::*;
pub use literal::*;
pub use operator::*;

pub use octofhir_acmg_diagnostics::Span;

/// A node with source span information
pub type Spanned<T> = octofhir_acmg_diagnostics::Spanned<T>;

/// Type alias for boxed expressions
pub type BoxExpr = Box<Spanned<Expression>>;

/// An identifier (variable name segment, function name, keyword argument)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

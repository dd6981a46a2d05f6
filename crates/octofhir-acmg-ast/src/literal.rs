//! Literal AST nodes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value written in condition text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// `None` / `null`
    None,
    /// `True` / `False` (also lowercase)
    Boolean(bool),
    Integer(i64),
    /// Any number with a fraction or exponent, e.g. `0.15`, `2e-05`
    Decimal(Decimal),
    /// Single or double quoted string
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Boolean(true) => f.write_str("True"),
            Literal::Boolean(false) => f.write_str("False"),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Decimal(d) => write!(f, "{}", d.normalize()),
            Literal::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

//! Condition operators with precedence information

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Precedence 1 (lowest)
    Or,

    // Precedence 2
    And,

    // Precedence 4 (3 is unary `not`)
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// Membership in a list, or substring of a string
    In,
    NotIn,
    /// Identity test, only meaningful against `None` and booleans
    Is,
    IsNot,

    // Precedence 5
    Add,
    Subtract,

    // Precedence 6
    Multiply,
    Divide,
}

impl BinaryOp {
    /// Precedence level, higher binds tighter
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal
            | Self::NotEqual
            | Self::Less
            | Self::LessOrEqual
            | Self::Greater
            | Self::GreaterOrEqual
            | Self::In
            | Self::NotIn
            | Self::Is
            | Self::IsNot => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide => 6,
        }
    }

    pub const fn is_comparison(&self) -> bool {
        self.precedence() == 4
    }

    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide
        )
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical negation (precedence 3)
    Not,
    /// Arithmetic negation (binds tighter than any binary operator)
    Negate,
}

impl UnaryOp {
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Not => 3,
            Self::Negate => 7,
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Not => f.write_str("not "),
            Self::Negate => f.write_str("-"),
        }
    }
}

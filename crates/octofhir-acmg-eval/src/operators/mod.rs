//! Condition operator implementations
//!
//! - Logical operators (`and`, `or`, `not`) with short-circuiting
//! - Comparison and membership operators (`==`, `<`, `in`, `is`, ...)
//! - Arithmetic operators (`+ - * /`, unary `-`)
//! - Function calls, including `history_count`

pub mod arithmetic;
pub mod comparison;
pub mod functions;
pub mod logical;

pub use arithmetic::*;
pub use comparison::*;
pub use functions::*;
pub use logical::*;

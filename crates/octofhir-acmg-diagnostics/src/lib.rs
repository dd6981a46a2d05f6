//! Diagnostics and error handling for the ACMG rule engine
//!
//! Provides error codes, spans into condition text, the [`AcmgError`] type used
//! across the workspace, and the per-session [`DiagnosticLog`] that collects
//! every non-fatal problem found while evaluating a variant record.

mod error;
mod error_code;
mod collector;
mod span;

pub use collector::*;
pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for rule engine operations
pub type Result<T> = std::result::Result<T, AcmgError>;

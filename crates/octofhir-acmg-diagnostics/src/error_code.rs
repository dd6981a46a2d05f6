//! Error codes for the rule engine
//!
//! Error code ranges:
//! - ACMG0001-ACMG0099: Condition syntax errors
//! - ACMG0100-ACMG0199: Rule-set and configuration errors
//! - ACMG0200-ACMG0299: Evaluation errors (runtime)
//! - ACMG0300-ACMG0399: History store and variant record errors
//! - ACMG0400-ACMG0499: System errors (I/O, cancellation)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Static description for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_syntax_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_definition_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_record_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ACMG{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub description: &'static str,
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Condition syntax (0001-0099)
    map.insert(1, ErrorInfo::new("Unexpected token"));
    map.insert(2, ErrorInfo::new("Unexpected end of condition"));
    map.insert(3, ErrorInfo::new("Unterminated string literal"));
    map.insert(4, ErrorInfo::new("Invalid number literal"));
    map.insert(5, ErrorInfo::new("Unbalanced annotation label"));
    map.insert(6, ErrorInfo::new("Empty condition"));
    map.insert(7, ErrorInfo::new("Invalid condition node")
        .with_help("Use a boolean, a string, a list, or a single-key {and: [...]} / {or: [...]} map"));

    // Rule set and configuration (0100-0199)
    map.insert(100, ErrorInfo::new("Invalid rule set document"));
    map.insert(101, ErrorInfo::new("Unknown condition level")
        .with_help("Recognized keys: cond_not_applicable, cond_needs_manual_input, cond_standalone, cond_very_strong, cond_strong, cond_moderate, cond_supporting, cond_match"));
    map.insert(102, ErrorInfo::new("Circular criterion reference"));
    map.insert(103, ErrorInfo::new("Unknown threshold")
        .with_help("Configured thresholds must be referenced by a condition or declared under consts"));
    map.insert(104, ErrorInfo::new("Invalid configuration document"));
    map.insert(105, ErrorInfo::new("Unknown function"));
    map.insert(106, ErrorInfo::new("Invalid history filter"));
    map.insert(107, ErrorInfo::new("Circular variable definition"));
    map.insert(108, ErrorInfo::new("Invalid aggregation thresholds"));
    map.insert(109, ErrorInfo::new("Duplicate definition"));
    map.insert(110, ErrorInfo::new("Undefined warning identifier")
        .with_help("Declare the message under the rule set's top-level `warnings` map"));

    // Evaluation (0200-0299)
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(201, ErrorInfo::new("Unresolved variable"));
    map.insert(202, ErrorInfo::new("Type mismatch"));
    map.insert(203, ErrorInfo::new("Division by zero"));
    map.insert(204, ErrorInfo::new("Condition failed"));
    map.insert(205, ErrorInfo::new("Invalid argument count"));
    map.insert(206, ErrorInfo::new("Aggregation input inconsistency"));

    // History store and variant record (0300-0399)
    map.insert(300, ErrorInfo::new("History store failure"));
    map.insert(301, ErrorInfo::new("History query timed out"));
    map.insert(302, ErrorInfo::new("Malformed history query"));
    map.insert(303, ErrorInfo::new("Variant record validation failed"));

    // System (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Evaluation cancelled"));

    map
});

// Condition syntax
pub const ACMG0001: ErrorCode = ErrorCode::new(1);
pub const ACMG0002: ErrorCode = ErrorCode::new(2);
pub const ACMG0003: ErrorCode = ErrorCode::new(3);
pub const ACMG0004: ErrorCode = ErrorCode::new(4);
pub const ACMG0005: ErrorCode = ErrorCode::new(5);
pub const ACMG0006: ErrorCode = ErrorCode::new(6);
pub const ACMG0007: ErrorCode = ErrorCode::new(7);

// Rule set and configuration
pub const ACMG0100: ErrorCode = ErrorCode::new(100);
pub const ACMG0101: ErrorCode = ErrorCode::new(101);
pub const ACMG0102: ErrorCode = ErrorCode::new(102);
pub const ACMG0103: ErrorCode = ErrorCode::new(103);
pub const ACMG0104: ErrorCode = ErrorCode::new(104);
pub const ACMG0105: ErrorCode = ErrorCode::new(105);
pub const ACMG0106: ErrorCode = ErrorCode::new(106);
pub const ACMG0107: ErrorCode = ErrorCode::new(107);
pub const ACMG0108: ErrorCode = ErrorCode::new(108);
pub const ACMG0109: ErrorCode = ErrorCode::new(109);
pub const ACMG0110: ErrorCode = ErrorCode::new(110);

// Evaluation
pub const ACMG0200: ErrorCode = ErrorCode::new(200);
pub const ACMG0201: ErrorCode = ErrorCode::new(201);
pub const ACMG0202: ErrorCode = ErrorCode::new(202);
pub const ACMG0203: ErrorCode = ErrorCode::new(203);
pub const ACMG0204: ErrorCode = ErrorCode::new(204);
pub const ACMG0205: ErrorCode = ErrorCode::new(205);
pub const ACMG0206: ErrorCode = ErrorCode::new(206);

// History and record
pub const ACMG0300: ErrorCode = ErrorCode::new(300);
pub const ACMG0301: ErrorCode = ErrorCode::new(301);
pub const ACMG0302: ErrorCode = ErrorCode::new(302);
pub const ACMG0303: ErrorCode = ErrorCode::new(303);

// System
pub const ACMG0400: ErrorCode = ErrorCode::new(400);
pub const ACMG0401: ErrorCode = ErrorCode::new(401);
pub const ACMG0402: ErrorCode = ErrorCode::new(402);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ACMG0001.to_string(), "ACMG0001");
        assert_eq!(ACMG0201.to_string(), "ACMG0201");
    }

    #[test]
    fn test_error_categories() {
        assert!(ACMG0003.is_syntax_error());
        assert!(!ACMG0003.is_definition_error());
        assert!(ACMG0102.is_definition_error());
        assert!(ACMG0204.is_evaluation_error());
        assert!(ACMG0301.is_record_error());
        assert!(ACMG0402.is_system_error());
    }

    #[test]
    fn test_error_info() {
        assert_eq!(ACMG0203.info().description, "Division by zero");
        assert!(ACMG0101.info().help.is_some());
        assert_eq!(ErrorCode::new(999).info().description, "Unknown error");
    }
}

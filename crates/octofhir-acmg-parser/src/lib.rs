//! Condition expression parser using Winnow
//!
//! Parses the small expression language criterion conditions are written in:
//! boolean combinators, comparisons and membership tests, arithmetic, function
//! calls with keyword arguments, literals, and dotted variable references with
//! optional parenthesised display labels.

mod combinators;
mod expression;
mod recovery;

use octofhir_acmg_ast::{Expression, Spanned};
use octofhir_acmg_diagnostics::{ACMG0001, ACMG0006, AcmgError, Result, Span};
use winnow::stream::LocatingSlice;

use crate::combinators::ws;
use crate::expression::condition_expression;

/// Parse a single condition expression
///
/// ```
/// use octofhir_acmg_parser::parse_expression;
///
/// let expr = parse_expression("dominant and maf >= ba1_maf_limit_dominant").unwrap();
/// assert_eq!(expr.to_string(), "dominant and maf >= ba1_maf_limit_dominant");
/// ```
pub fn parse_expression(source: &str) -> Result<Spanned<Expression>> {
    if source.trim().is_empty() {
        return Err(AcmgError::parse(ACMG0006, "empty condition", source));
    }

    let mut input = LocatingSlice::new(source);
    let parsed = condition_expression(&mut input);
    let _ = ws(&mut input);

    match parsed {
        Ok(expr) if input.is_empty() => Ok(expr),
        Ok(_) => {
            if let Some(err) = recovery::malformed_number(source) {
                return Err(err);
            }
            let offset = source.len() - input.len();
            let token = recovery::token_at(source, offset);
            Err(AcmgError::parse_at(
                ACMG0001,
                format!("unexpected `{token}`"),
                source,
                Span::new(offset, offset + token.len()),
            ))
        }
        Err(_) => Err(recovery::locate_error(source)),
    }
}

/// Check syntax without keeping the tree
pub fn validate_expression(source: &str) -> Result<()> {
    parse_expression(source).map(|_| ())
}

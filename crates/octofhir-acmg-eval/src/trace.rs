//! Evaluation trace rendering
//!
//! A trace mirrors the condition tree. Leaves show the expression with every
//! resolved value written in front of its name, e.g.
//! `0.000399361 (maf) >= 0.0002 (bs1_strong_maf_limit_dominant)`.

use crate::error::EvalError;
use crate::operators::functions::call_key;
use indexmap::IndexMap;
use octofhir_acmg_ast::{Condition, Expression};
use octofhir_acmg_diagnostics::AcmgError;
use octofhir_acmg_types::Value;
use serde_json::json;

/// Render an expression with captured values substituted in
pub fn render(expr: &Expression, captures: &IndexMap<String, Value>) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, captures);
    out
}

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::Binary(b) => b.op.precedence(),
        Expression::Unary(u) => u.op.precedence(),
        _ => u8::MAX,
    }
}

fn write_operand(out: &mut String, expr: &Expression, min: u8, captures: &IndexMap<String, Value>) {
    if precedence(expr) < min {
        out.push('(');
        write_expr(out, expr, captures);
        out.push(')');
    } else {
        write_expr(out, expr, captures);
    }
}

fn write_expr(out: &mut String, expr: &Expression, captures: &IndexMap<String, Value>) {
    match expr {
        Expression::Variable(var) => {
            let name = var.name();
            match captures.get(&name) {
                Some(value) => out.push_str(&format!("{value} ({name})")),
                None => out.push_str(&name),
            }
        }
        Expression::Call(call) => {
            let key = call_key(call);
            match captures.get(&key) {
                Some(value) => out.push_str(&format!("{value} ({key})")),
                None => out.push_str(&key),
            }
        }
        Expression::Binary(b) => {
            let prec = b.op.precedence();
            write_operand(out, &b.left.inner, prec, captures);
            out.push_str(&format!(" {} ", b.op));
            write_operand(out, &b.right.inner, prec + 1, captures);
        }
        Expression::Unary(u) => {
            out.push_str(&u.op.to_string());
            write_operand(out, &u.operand.inner, u.op.precedence(), captures);
        }
        Expression::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, &item.inner, captures);
            }
            out.push(']');
        }
        Expression::Annotated(a) => write_expr(out, &a.expr.inner, captures),
        Expression::Literal(_) => out.push_str(&expr.to_string()),
    }
}

pub fn leaf(rendered: String, result: bool) -> serde_json::Value {
    json!({ "expression": rendered, "result": result })
}

pub fn leaf_error(source: &str, error: &EvalError) -> serde_json::Value {
    json!({ "expression": source, "error": format!("{}: {error}", error.code()) })
}

pub fn invalid(source: &str, error: &AcmgError) -> serde_json::Value {
    json!({ "expression": source, "error": error.to_string() })
}

/// A condition that was never evaluated
pub fn skipped(condition: &Condition) -> serde_json::Value {
    json!({ "expression": condition.to_string(), "skipped": true })
}

pub fn node(operator: &str, children: Vec<serde_json::Value>, result: bool) -> serde_json::Value {
    json!({ operator: children, "result": result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_acmg_parser::parse_expression;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_render_with_values() {
        let expr = parse_expression("dominant and maf >= bs1_strong_maf_limit_dominant").unwrap();
        let mut captures = IndexMap::new();
        captures.insert("dominant".to_string(), Value::Bool(true));
        captures.insert("maf".to_string(), Value::Decimal(Decimal::from_str("0.000399361").unwrap()));
        captures.insert(
            "bs1_strong_maf_limit_dominant".to_string(),
            Value::Decimal(Decimal::from_str("0.0002").unwrap()),
        );
        assert_eq!(
            render(&expr.inner, &captures),
            "True (dominant) and 0.000399361 (maf) >= 0.0002 (bs1_strong_maf_limit_dominant)"
        );
    }

    #[test]
    fn test_unresolved_parts_keep_their_names() {
        let expr = parse_expression("not (a or b)").unwrap();
        let mut captures = IndexMap::new();
        captures.insert("a".to_string(), Value::None);
        assert_eq!(render(&expr.inner, &captures), "not (None (a) or b)");
    }

    #[test]
    fn test_rendered_input_reads_back() {
        let expr = parse_expression("0.0004 (maf) >= 0.0002 (limit)").unwrap();
        let mut captures = IndexMap::new();
        captures.insert("maf".to_string(), Value::Integer(1));
        assert_eq!(render(&expr.inner, &captures), "1 (maf) >= limit");
    }

    #[test]
    fn test_nodes() {
        let trace = node("or", vec![leaf("True (dominant)".into(), true)], true);
        assert_eq!(
            trace,
            json!({"or": [{"expression": "True (dominant)", "result": true}], "result": true})
        );
    }
}

//! Comparison, membership and identity operators
//!
//! Ordering against `None` yields `None` rather than an error, so a missing
//! frequency or score makes the comparison unknown (and the condition false).

use crate::error::{EvalError, EvalResult};
use octofhir_acmg_ast::BinaryOp;
use octofhir_acmg_types::Value;
use std::cmp::Ordering;

/// Apply a comparison-level operator
pub fn compare(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Equal => Ok(Value::Bool(left.loose_eq(right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!left.loose_eq(right))),
        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            ordering(op, left, right)
        }
        BinaryOp::In => membership(op, left, right),
        BinaryOp::NotIn => membership(op, left, right).map(|v| match v {
            Value::Bool(b) => Value::Bool(!b),
            other => other,
        }),
        BinaryOp::Is => Ok(Value::Bool(identical(left, right))),
        BinaryOp::IsNot => Ok(Value::Bool(!identical(left, right))),
        _ => Err(EvalError::Internal {
            message: format!("`{op}` is not a comparison operator"),
        }),
    }
}

fn ordering(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_none() || right.is_none() {
        return Ok(Value::None);
    }
    let Some(order) = left.partial_compare(right) else {
        return Err(EvalError::type_mismatch(
            op.symbol(),
            left.type_name(),
            right.type_name(),
        ));
    };
    let result = match op {
        BinaryOp::Less => order == Ordering::Less,
        BinaryOp::LessOrEqual => order != Ordering::Greater,
        BinaryOp::Greater => order == Ordering::Greater,
        _ => order != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn membership(op: BinaryOp, item: &Value, container: &Value) -> EvalResult<Value> {
    if container.is_none() {
        return Ok(Value::None);
    }
    match container.contains(item) {
        Some(found) => Ok(Value::Bool(found)),
        // `None in 'text'` and similar: the item is unknown
        None if item.is_none() => Ok(Value::None),
        None => Err(EvalError::type_mismatch(
            op.symbol(),
            item.type_name(),
            container.type_name(),
        )),
    }
}

/// `is`: same kind and equal value, so `1 is True` is false
fn identical(left: &Value, right: &Value) -> bool {
    left.type_name() == right.type_name() && left.loose_eq(right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    #[rstest]
    #[case(BinaryOp::GreaterOrEqual, dec("0.000399361"), dec("0.0002"), Value::Bool(true))]
    #[case(BinaryOp::Less, Value::Integer(2), dec("2.5"), Value::Bool(true))]
    #[case(BinaryOp::Greater, Value::None, dec("0.1"), Value::None)]
    #[case(BinaryOp::LessOrEqual, Value::Integer(3), Value::None, Value::None)]
    #[case(BinaryOp::Equal, Value::Integer(1), dec("1.0"), Value::Bool(true))]
    #[case(BinaryOp::Equal, Value::None, Value::None, Value::Bool(true))]
    #[case(BinaryOp::NotEqual, Value::None, Value::Integer(0), Value::Bool(true))]
    #[case(BinaryOp::In, Value::from("missense"), Value::from("missense_variant"), Value::Bool(true))]
    #[case(BinaryOp::NotIn, Value::from("AD"), Value::from(vec!["AR", "XLR"]), Value::Bool(true))]
    #[case(BinaryOp::In, Value::from("x"), Value::None, Value::None)]
    #[case(BinaryOp::Is, Value::None, Value::None, Value::Bool(true))]
    #[case(BinaryOp::Is, Value::Integer(1), Value::Bool(true), Value::Bool(false))]
    #[case(BinaryOp::IsNot, Value::Bool(false), Value::None, Value::Bool(true))]
    fn test_compare(#[case] op: BinaryOp, #[case] left: Value, #[case] right: Value, #[case] expected: Value) {
        let result = compare(op, &left, &right).unwrap();
        assert_eq!(result, expected);
        assert_eq!(result.type_name(), expected.type_name());
    }

    #[test]
    fn test_incomparable_types() {
        let err = compare(BinaryOp::Less, &Value::from("a"), &Value::Integer(1)).unwrap_err();
        assert_eq!(err, EvalError::type_mismatch("<", "str", "int"));

        let err = compare(BinaryOp::In, &Value::Integer(1), &Value::Integer(2)).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }
}

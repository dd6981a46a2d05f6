//! Arithmetic and numeric conversion rules
//!
//! Integers stay integers under `+ - *` until they overflow; `/` always yields
//! a decimal. `None` on either side propagates as `None`.

use crate::Value;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::str::FromStr;
use thiserror::Error;

/// Arithmetic failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow in {0}")]
    Overflow(&'static str),
}

pub type ValueResult<T> = Result<T, ValueError>;

/// Parse decimal text, accepting exponent notation (`2e-05`)
pub fn decimal_from_text(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .or_else(|_| Decimal::from_scientific(&text.to_ascii_lowercase()))
        .ok()
}

/// Convert through the shortest round-trip text so `0.1` stays `0.1`
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    decimal_from_text(&value.to_string()).or_else(|| Decimal::from_f64(value))
}

/// Decimal as a JSON number
pub fn decimal_to_json(value: Decimal) -> serde_json::Value {
    let text = value.normalize().to_string();
    match text.parse::<serde_json::Number>() {
        Ok(number) => serde_json::Value::Number(number),
        Err(_) => value
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
    }
}

fn mismatch(op: &'static str, left: &Value, right: &Value) -> ValueError {
    ValueError::TypeMismatch {
        op,
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Shared integer/decimal dispatch for `+ - *`
fn numeric(
    op: &'static str,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    dec_op: fn(Decimal, Decimal) -> Option<Decimal>,
) -> ValueResult<Value> {
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        if let Some(result) = int_op(*a, *b) {
            return Ok(Value::Integer(result));
        }
    }
    match (left.as_decimal(), right.as_decimal()) {
        (Some(a), Some(b)) => dec_op(a, b)
            .map(Value::Decimal)
            .ok_or(ValueError::Overflow(op)),
        _ => Err(mismatch(op, left, right)),
    }
}

pub fn add(left: &Value, right: &Value) -> ValueResult<Value> {
    match (left, right) {
        (Value::None, _) | (_, Value::None) => Ok(Value::None),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => Ok(Value::List(a.iter().chain(b).cloned().collect())),
        _ => numeric("+", left, right, i64::checked_add, Decimal::checked_add),
    }
}

pub fn subtract(left: &Value, right: &Value) -> ValueResult<Value> {
    match (left, right) {
        (Value::None, _) | (_, Value::None) => Ok(Value::None),
        _ => numeric("-", left, right, i64::checked_sub, Decimal::checked_sub),
    }
}

pub fn multiply(left: &Value, right: &Value) -> ValueResult<Value> {
    match (left, right) {
        (Value::None, _) | (_, Value::None) => Ok(Value::None),
        _ => numeric("*", left, right, i64::checked_mul, Decimal::checked_mul),
    }
}

pub fn divide(left: &Value, right: &Value) -> ValueResult<Value> {
    if left.is_none() || right.is_none() {
        return Ok(Value::None);
    }
    let (Some(a), Some(b)) = (left.as_decimal(), right.as_decimal()) else {
        return Err(mismatch("/", left, right));
    };
    if b.is_zero() {
        return Err(ValueError::DivisionByZero);
    }
    a.checked_div(b)
        .map(Value::Decimal)
        .ok_or(ValueError::Overflow("/"))
}

pub fn negate(value: &Value) -> ValueResult<Value> {
    match value {
        Value::None => Ok(Value::None),
        Value::Integer(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or(ValueError::Overflow("-")),
        Value::Decimal(d) => Ok(Value::Decimal(-*d)),
        Value::Bool(b) => Ok(Value::Integer(-i64::from(*b))),
        other => Err(ValueError::TypeMismatch {
            op: "-",
            left: other.type_name(),
            right: "",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        assert_eq!(add(&Value::Integer(2), &Value::Integer(3)).unwrap(), Value::Integer(5));
        assert!(matches!(
            multiply(&Value::Integer(2), &Value::Integer(3)).unwrap(),
            Value::Integer(6)
        ));
    }

    #[test]
    fn test_overflow_promotes_to_decimal() {
        let result = add(&Value::Integer(i64::MAX), &Value::Integer(1)).unwrap();
        assert!(matches!(result, Value::Decimal(_)));
    }

    #[test]
    fn test_division_is_exact_decimal() {
        assert_eq!(divide(&Value::Integer(1), &Value::Integer(4)).unwrap(), dec("0.25"));
        assert_eq!(
            divide(&Value::Integer(1), &Value::Integer(0)),
            Err(ValueError::DivisionByZero)
        );
    }

    #[test]
    fn test_none_propagates() {
        assert_eq!(subtract(&Value::None, &Value::Integer(1)).unwrap(), Value::None);
        assert_eq!(divide(&Value::Integer(1), &Value::None).unwrap(), Value::None);
    }

    #[test]
    fn test_type_mismatch() {
        let err = subtract(&Value::from("a"), &Value::Integer(1)).unwrap_err();
        assert_eq!(err.to_string(), "unsupported operand types for -: str and int");
    }

    #[test]
    fn test_float_conversion_keeps_short_form() {
        assert_eq!(decimal_from_f64(0.1), Decimal::from_str("0.1").ok());
        assert_eq!(decimal_from_text("2e-05"), Decimal::from_str("0.00002").ok());
        assert_eq!(decimal_from_f64(f64::NAN), None);
    }
}

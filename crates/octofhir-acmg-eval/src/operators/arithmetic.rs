//! Arithmetic operators over decimal numbers

use crate::error::{EvalError, EvalResult};
use octofhir_acmg_ast::BinaryOp;
use octofhir_acmg_types::{Value, add, divide, multiply, negate, subtract};

/// Apply `+ - * /`; `None` operands propagate
pub fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    let result = match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Subtract => subtract(left, right),
        BinaryOp::Multiply => multiply(left, right),
        BinaryOp::Divide => divide(left, right),
        _ => {
            return Err(EvalError::Internal {
                message: format!("`{op}` is not an arithmetic operator"),
            });
        }
    };
    Ok(result?)
}

/// Unary `-`
pub fn arithmetic_negate(operand: &Value) -> EvalResult<Value> {
    Ok(negate(operand)?)
}

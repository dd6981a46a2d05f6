//! Logical operators
//!
//! `and` / `or` short-circuit left to right and return the deciding operand,
//! so `maf or 0` yields the frequency when it is known. `not` maps an unknown
//! operand to `None`, which keeps negated unknowns falsy.

use crate::context::UnitContext;
use crate::engine::AcmgEngine;
use crate::error::EvalResult;
use octofhir_acmg_ast::{BinaryOp, BinaryOpExpr};
use octofhir_acmg_types::Value;

impl AcmgEngine {
    /// `a and b`: `a` when falsy, otherwise `b`; `b` is not evaluated when `a` is falsy
    pub(crate) async fn eval_and<'a>(
        &'a self,
        expr: &'a BinaryOpExpr,
        ctx: &'a UnitContext<'a>,
    ) -> EvalResult<Value> {
        let left = self.evaluate(&expr.left, ctx).await?;
        if !left.is_truthy() {
            return Ok(left);
        }
        self.evaluate(&expr.right, ctx).await
    }

    /// `a or b`: `a` when truthy, otherwise `b`
    pub(crate) async fn eval_or<'a>(
        &'a self,
        expr: &'a BinaryOpExpr,
        ctx: &'a UnitContext<'a>,
    ) -> EvalResult<Value> {
        let left = self.evaluate(&expr.left, ctx).await?;
        if left.is_truthy() {
            return Ok(left);
        }
        self.evaluate(&expr.right, ctx).await
    }

    pub(crate) async fn eval_logical<'a>(
        &'a self,
        expr: &'a BinaryOpExpr,
        ctx: &'a UnitContext<'a>,
    ) -> EvalResult<Value> {
        match expr.op {
            BinaryOp::And => self.eval_and(expr, ctx).await,
            _ => self.eval_or(expr, ctx).await,
        }
    }
}

/// `not x`
pub fn logical_not(operand: &Value) -> Value {
    match operand {
        Value::None => Value::None,
        other => Value::Bool(!other.is_truthy()),
    }
}

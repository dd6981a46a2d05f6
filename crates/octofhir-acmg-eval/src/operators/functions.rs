//! Function calls
//!
//! Implements: history_count, len, min, max, abs

use crate::context::UnitContext;
use crate::engine::AcmgEngine;
use crate::error::{EvalError, EvalResult};
use octofhir_acmg_ast::FunctionCall;
use octofhir_acmg_diagnostics::{ACMG0302, Diagnostic};
use octofhir_acmg_model::HistoryQuery;
use octofhir_acmg_types::Value;
use std::cmp::Ordering;

/// Name of the history lookup function
pub const HISTORY_COUNT: &str = "history_count";

/// Functions available to every rule set
pub const STANDARD_FUNCTIONS: &[&str] = &[HISTORY_COUNT, "len", "min", "max", "abs"];

pub fn is_known_function(name: &str) -> bool {
    STANDARD_FUNCTIONS.contains(&name)
}

impl AcmgEngine {
    /// Evaluate a call; the result is captured for trace rendering
    pub(crate) async fn eval_call<'a>(
        &'a self,
        call: &'a FunctionCall,
        ctx: &'a UnitContext<'a>,
    ) -> EvalResult<Value> {
        let name = call.name.as_str();
        let value = if name == HISTORY_COUNT {
            self.history_count(call, ctx).await?
        } else {
            if !self.functions().contains(name) {
                return Err(EvalError::unknown_function(name));
            }
            if !call.kwargs.is_empty() {
                return Err(EvalError::invalid_arguments(name, "keyword arguments are not supported"));
            }
            let mut args = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                args.push(self.evaluate(arg, ctx).await?);
            }
            match self.functions().get(name) {
                Some(function) => function(&args)?,
                None => return Err(EvalError::unknown_function(name)),
            }
        };
        ctx.capture(call_key(call), value.clone());
        Ok(value)
    }

    /// `history_count(field=value, field__op=value, __distinct=[...], ...)`
    ///
    /// Arguments that do not form a query count as 0 with an `ACMG0302` warning.
    async fn history_count<'a>(
        &'a self,
        call: &'a FunctionCall,
        ctx: &'a UnitContext<'a>,
    ) -> EvalResult<Value> {
        if !call.args.is_empty() {
            return Err(EvalError::invalid_arguments(
                HISTORY_COUNT,
                "filters must be passed as keyword arguments",
            ));
        }

        let mut filters = Vec::with_capacity(call.kwargs.len());
        for kwarg in &call.kwargs {
            let value = self.evaluate(&kwarg.value, ctx).await?;
            filters.push((kwarg.name.as_str(), value));
        }
        let query = match HistoryQuery::from_arguments(filters) {
            Ok(query) => query,
            Err(err) => {
                let key = format!("history:{}", call_key(call));
                ctx.report_once(
                    &key,
                    Diagnostic::warning(ACMG0302, format!("{err}; `{HISTORY_COUNT}` counted as 0")),
                );
                return Ok(Value::Integer(0));
            }
        };

        let result = ctx.history.count(&query).await;
        if let Some(warning) = result.warning {
            ctx.report(warning);
        }
        Ok(Value::Integer(i64::try_from(result.count).unwrap_or(i64::MAX)))
    }
}

/// Capture key of a call: its source form
pub(crate) fn call_key(call: &FunctionCall) -> String {
    octofhir_acmg_ast::Expression::Call(call.clone()).to_string()
}

fn arity(function: &str, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::invalid_arguments(
            function,
            format!("expected {expected} argument(s), got {}", args.len()),
        ))
    }
}

/// `len(x)`: length of a string, list or map; `None` stays unknown
pub fn fn_len(args: &[Value]) -> EvalResult<Value> {
    arity("len", args, 1)?;
    match &args[0] {
        Value::None => Ok(Value::None),
        value => match value.len() {
            Some(len) => Ok(Value::Integer(i64::try_from(len).unwrap_or(i64::MAX))),
            None => Err(EvalError::invalid_arguments(
                "len",
                format!("object of type {} has no len()", value.type_name()),
            )),
        },
    }
}

/// `min(a, b, ...)` or `min(list)`
pub fn fn_min(args: &[Value]) -> EvalResult<Value> {
    extreme("min", args, Ordering::Less)
}

/// `max(a, b, ...)` or `max(list)`
pub fn fn_max(args: &[Value]) -> EvalResult<Value> {
    extreme("max", args, Ordering::Greater)
}

fn extreme(function: &str, args: &[Value], wanted: Ordering) -> EvalResult<Value> {
    let items: &[Value] = match args {
        [Value::List(items)] => items,
        [Value::None] => return Ok(Value::None),
        _ => args,
    };
    if items.is_empty() {
        return Err(EvalError::invalid_arguments(function, "arg is an empty sequence"));
    }
    // Any unknown member makes the extreme unknown
    if items.iter().any(Value::is_none) {
        return Ok(Value::None);
    }

    let mut best = &items[0];
    for item in &items[1..] {
        match item.partial_compare(best) {
            Some(order) if order == wanted => best = item,
            Some(_) => {}
            None => {
                return Err(EvalError::type_mismatch(
                    function,
                    item.type_name(),
                    best.type_name(),
                ));
            }
        }
    }
    Ok(best.clone())
}

/// `abs(x)`
pub fn fn_abs(args: &[Value]) -> EvalResult<Value> {
    arity("abs", args, 1)?;
    match &args[0] {
        Value::None => Ok(Value::None),
        Value::Integer(i) => i
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| EvalError::Overflow {
                operation: "abs".to_string(),
            }),
        Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
        Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        other => Err(EvalError::invalid_arguments(
            "abs",
            format!("bad operand type for abs(): {}", other.type_name()),
        )),
    }
}

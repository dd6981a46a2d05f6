//! ACMG condition evaluation engine
//!
//! This module provides the main [`AcmgEngine`] struct which interprets parsed
//! condition trees against a [`UnitContext`].

use crate::context::UnitContext;
use crate::definition::VarDefinition;
use crate::error::EvalResult;
use crate::operators::{arithmetic, arithmetic_negate, compare, logical_not};
use crate::registry::FunctionRegistry;
use crate::trace;
use futures::FutureExt;
use futures::future::BoxFuture;
use octofhir_acmg_ast::{Condition, Expression, Spanned, UnaryOp, VariableRef};
use octofhir_acmg_diagnostics::{AcmgError, Diagnostic, Severity};
use octofhir_acmg_types::Value;

/// Result of evaluating one condition tree
#[derive(Debug)]
pub struct Traced {
    /// Truth of the condition; an error fails the whole tree
    pub result: EvalResult<bool>,
    pub trace: serde_json::Value,
}

impl Traced {
    fn ok(result: bool, trace: serde_json::Value) -> Self {
        Self {
            result: Ok(result),
            trace,
        }
    }

    /// `false` unless the condition evaluated to true
    pub fn is_true(&self) -> bool {
        matches!(self.result, Ok(true))
    }
}

/// The condition evaluation engine
///
/// The engine is stateless between calls; everything that varies per record
/// lives in the [`UnitContext`].
#[derive(Debug, Clone)]
pub struct AcmgEngine {
    functions: FunctionRegistry,
}

impl Default for AcmgEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AcmgEngine {
    /// Create a new engine with the standard functions
    pub fn new() -> Self {
        Self {
            functions: FunctionRegistry::with_standard_functions(),
        }
    }

    /// Create an engine with a custom function registry
    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Evaluate an expression to a value
    pub fn evaluate<'a>(
        &'a self,
        expr: &'a Spanned<Expression>,
        ctx: &'a UnitContext<'a>,
    ) -> BoxFuture<'a, EvalResult<Value>> {
        async move {
            match &expr.inner {
                Expression::Literal(literal) => Ok(Value::from(literal)),
                Expression::List(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.evaluate(item, ctx).await?);
                    }
                    Ok(Value::List(values))
                }
                Expression::Variable(var) => self.resolve_variable(var, ctx).await,
                Expression::Binary(binary) if binary.op.is_logical() => {
                    self.eval_logical(binary, ctx).await
                }
                Expression::Binary(binary) => {
                    let left = self.evaluate(&binary.left, ctx).await?;
                    let right = self.evaluate(&binary.right, ctx).await?;
                    if binary.op.is_arithmetic() {
                        arithmetic(binary.op, &left, &right)
                    } else {
                        compare(binary.op, &left, &right)
                    }
                }
                Expression::Unary(unary) => {
                    let operand = self.evaluate(&unary.operand, ctx).await?;
                    match unary.op {
                        UnaryOp::Not => Ok(logical_not(&operand)),
                        UnaryOp::Negate => arithmetic_negate(&operand),
                    }
                }
                Expression::Call(call) => self.eval_call(call, ctx).await,
                Expression::Annotated(annotated) => self.evaluate(&annotated.expr, ctx).await,
            }
        }
        .boxed()
    }

    /// Resolve a name: threshold, criterion reference, derived variable, then
    /// record fields. Unresolvable names are `None`.
    pub fn resolve_variable<'a>(
        &'a self,
        var: &'a VariableRef,
        ctx: &'a UnitContext<'a>,
    ) -> BoxFuture<'a, EvalResult<Value>> {
        async move {
            let value = if let Some(value) = ctx.threshold(var.head()).filter(|_| !var.is_dotted()) {
                value.clone()
            } else if let Some(value) = ctx.criterion_attribute(var) {
                value
            } else if let Some(definition) = ctx.rules.var(var.head()) {
                let value = self.derived_variable(var.head(), definition, ctx).await?;
                var.path[1..]
                    .iter()
                    .try_fold(&value, |current, segment| current.get(segment.as_str()))
                    .cloned()
                    .unwrap_or(Value::None)
            } else if let Some(value) = ctx.lookup_record(var) {
                value
            } else {
                ctx.unresolved(var)
            };
            ctx.capture(var.name(), value.clone());
            Ok(value)
        }
        .boxed()
    }

    /// Value of a derived variable, memoized per unit
    async fn derived_variable<'a>(
        &'a self,
        name: &'a str,
        definition: &'a VarDefinition,
        ctx: &'a UnitContext<'a>,
    ) -> EvalResult<Value> {
        if let Some(value) = ctx.cached_var(name) {
            return Ok(value);
        }
        let value = match definition {
            VarDefinition::Path(path) => match ctx.lookup_record(path) {
                Some(value) => value,
                None => ctx.unresolved(path),
            },
            VarDefinition::Expr(Condition::Expr(parsed)) => self.evaluate(&parsed.expr, ctx).await?,
            VarDefinition::Expr(condition) | VarDefinition::Cond(condition) => {
                let traced = self.evaluate_condition(condition, ctx).await;
                Value::Bool(traced.result?)
            }
        };
        ctx.cache_var(name, value.clone());
        Ok(value)
    }

    /// Evaluate a condition tree to a boolean with its trace.
    ///
    /// `and` / `or` nodes short-circuit; children that were not evaluated are
    /// recorded as skipped. Invalid (unparsable) nodes are false and report
    /// their syntax error as a warning the first time a record reaches them.
    pub fn evaluate_condition<'a>(
        &'a self,
        condition: &'a Condition,
        ctx: &'a UnitContext<'a>,
    ) -> BoxFuture<'a, Traced> {
        async move {
            match condition {
                Condition::Flag(flag) => Traced::ok(*flag, serde_json::Value::Bool(*flag)),
                Condition::Expr(parsed) => {
                    ctx.begin_capture();
                    let result = self.evaluate(&parsed.expr, ctx).await;
                    let captures = ctx.end_capture();
                    match result {
                        Ok(value) => {
                            let truth = value.is_truthy();
                            Traced::ok(truth, trace::leaf(trace::render(&parsed.expr, &captures), truth))
                        }
                        Err(err) => Traced {
                            trace: trace::leaf_error(&parsed.source, &err),
                            result: Err(err),
                        },
                    }
                }
                Condition::Invalid { source, error } => {
                    report_invalid(ctx, source, error);
                    Traced::ok(false, trace::invalid(source, error))
                }
                Condition::All(items) => self.evaluate_node(items, true, ctx).await,
                Condition::Any(items) => self.evaluate_node(items, false, ctx).await,
            }
        }
        .boxed()
    }

    async fn evaluate_node<'a>(
        &'a self,
        items: &'a [Condition],
        all: bool,
        ctx: &'a UnitContext<'a>,
    ) -> Traced {
        let operator = if all { "and" } else { "or" };
        let mut children = Vec::with_capacity(items.len());
        let mut outcome: Option<EvalResult<bool>> = None;

        for item in items {
            if outcome.is_some() {
                children.push(trace::skipped(item));
                continue;
            }
            let child = self.evaluate_condition(item, ctx).await;
            children.push(child.trace);
            match child.result {
                Err(err) => outcome = Some(Err(err)),
                // `and` stops at the first false, `or` at the first true
                Ok(truth) if truth != all => outcome = Some(Ok(truth)),
                Ok(_) => {}
            }
        }

        let result = outcome.unwrap_or(Ok(all));
        let truth = matches!(result, Ok(true));
        Traced {
            result,
            trace: trace::node(operator, children, truth),
        }
    }
}

/// Surface a load-time syntax error at the point the condition is needed,
/// once per record however many units reach it
fn report_invalid(ctx: &UnitContext<'_>, source: &str, error: &AcmgError) {
    for diagnostic in error.to_diagnostics() {
        let key = format!("invalid:{}:{source}", diagnostic.code);
        ctx.report_once(
            &key,
            Diagnostic {
                severity: Severity::Warning,
                ..diagnostic
            },
        );
    }
}

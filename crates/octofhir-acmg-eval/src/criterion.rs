//! Criterion state machine
//!
//! Levels run in a fixed order: not-applicable, needs-manual-input, then the
//! graded levels strongest first. The first true level decides the state and
//! every later level is recorded as skipped. A level whose expression fails
//! counts as false; the failure is reported and noted in the comment.

use crate::context::UnitContext;
use crate::definition::{CriterionDefinition, Level};
use crate::engine::{AcmgEngine, Traced};
use crate::trace;
use indexmap::IndexMap;
use octofhir_acmg_ast::Condition;
use octofhir_acmg_diagnostics::{ACMG0204, Diagnostic};
use octofhir_acmg_model::{CalculatedOutcome, CriterionState, Strength};
use octofhir_acmg_types::Value;

/// What a single criterion run produced
#[derive(Debug, Clone)]
pub struct CriterionOutcome {
    pub outcome: CalculatedOutcome,
    /// Result of `cond_match`, or `state == met` when the criterion has none
    pub matched: bool,
    /// The level that decided the state, if any
    pub decided_by: Option<Level>,
}

impl AcmgEngine {
    pub async fn evaluate_criterion<'a>(
        &'a self,
        definition: &'a CriterionDefinition,
        ctx: &'a UnitContext<'a>,
    ) -> CriterionOutcome {
        let code = definition.code.as_str();
        ctx.enter_criterion(code);

        let mut evaluation = IndexMap::new();
        let mut notes = Vec::new();
        let mut decided_by = None;

        for level in Level::STATE_ORDER {
            let Some(condition) = definition.condition(level) else {
                continue;
            };
            if decided_by.is_some() {
                evaluation.insert(level.key(), trace::skipped(condition));
                continue;
            }
            let traced = self.evaluate_level(definition, level, condition, ctx, &mut notes).await;
            let truth = traced.is_true();
            ctx.set_level(code, level, truth);
            evaluation.insert(level.key(), traced.trace);
            if truth {
                decided_by = Some(level);
            }
        }

        let (state, strength) = match decided_by {
            Some(Level::NotApplicable) => (CriterionState::NotApplicable, Strength::None),
            Some(Level::NeedsManualInput) => (CriterionState::Undetermined, definition.nominal.strength()),
            Some(level) => (CriterionState::Met, level.strength()),
            None => (CriterionState::NotMet, Strength::None),
        };

        let graded = matches!(state, CriterionState::Met | CriterionState::NotMet);
        let matched = match definition.condition(Level::Match) {
            Some(condition) if graded => {
                let traced = self
                    .evaluate_level(definition, Level::Match, condition, ctx, &mut notes)
                    .await;
                let truth = traced.is_true();
                evaluation.insert(Level::Match.key(), traced.trace);
                truth
            }
            Some(condition) => {
                evaluation.insert(Level::Match.key(), trace::skipped(condition));
                false
            }
            None => state.is_met(),
        };
        ctx.set_level(code, Level::Match, matched);
        ctx.finish_run(code, state, strength);

        let mut info = self.evaluate_info(definition, ctx).await;
        if decided_by == Some(Level::Standalone) {
            info.insert("standalone".to_string(), Value::Bool(true));
        }
        let warnings = self
            .evaluate_warnings(definition, ctx, &mut evaluation, &mut notes)
            .await;
        ctx.leave_criterion();

        log::debug!(
            "{code}: {} / {} ({})",
            state.name(),
            strength.name(),
            ctx.subject()
        );

        CriterionOutcome {
            outcome: CalculatedOutcome {
                calculated_state: state,
                calculated_strength: strength,
                comment: notes.join("; "),
                info,
                evaluation,
                description: definition.description.clone(),
                warnings,
            },
            matched,
            decided_by,
        }
    }

    async fn evaluate_level<'a>(
        &'a self,
        definition: &'a CriterionDefinition,
        level: Level,
        condition: &'a Condition,
        ctx: &'a UnitContext<'a>,
        notes: &mut Vec<String>,
    ) -> Traced {
        let traced = self.evaluate_condition(condition, ctx).await;
        if let Err(err) = &traced.result {
            let key = level.key();
            ctx.report(
                Diagnostic::warning(ACMG0204, format!("{key} failed ({}): {err}", err.code()))
                    .with_criterion(definition.code.clone())
                    .with_source(condition.to_string(), None),
            );
            notes.push(format!("error in {key}: {err}"));
        }
        traced
    }

    /// Rule-authored warnings. Every `warn` condition runs whatever the state;
    /// each one that holds contributes its message. Traces go under `warn.<id>`.
    async fn evaluate_warnings<'a>(
        &'a self,
        definition: &'a CriterionDefinition,
        ctx: &'a UnitContext<'a>,
        evaluation: &mut IndexMap<String, serde_json::Value>,
        notes: &mut Vec<String>,
    ) -> Vec<String> {
        let mut messages = Vec::new();
        for (id, condition) in &definition.warn {
            let key = format!("warn.{id}");
            let traced = self.evaluate_condition(condition, ctx).await;
            if let Err(err) = &traced.result {
                ctx.report(
                    Diagnostic::warning(ACMG0204, format!("{key} failed ({}): {err}", err.code()))
                        .with_criterion(definition.code.clone())
                        .with_source(condition.to_string(), None),
                );
                notes.push(format!("error in {key}: {err}"));
            }
            if traced.is_true() {
                messages.push(ctx.rules.warning_message(id));
            }
            evaluation.insert(key, traced.trace);
        }
        messages
    }

    /// Auxiliary `info` values; failures are reported and stored as `None`
    async fn evaluate_info<'a>(
        &'a self,
        definition: &'a CriterionDefinition,
        ctx: &'a UnitContext<'a>,
    ) -> IndexMap<String, Value> {
        let mut info = IndexMap::new();
        for (name, condition) in &definition.info {
            let value = match condition {
                Condition::Expr(parsed) => match self.evaluate(&parsed.expr, ctx).await {
                    Ok(value) => value,
                    Err(err) => {
                        ctx.report(
                            Diagnostic::warning(ACMG0204, format!("info `{name}` failed: {err}"))
                                .with_source(parsed.source.clone(), None),
                        );
                        Value::None
                    }
                },
                other => {
                    let traced = self.evaluate_condition(other, ctx).await;
                    match traced.result {
                        Ok(truth) => Value::Bool(truth),
                        Err(_) => Value::None,
                    }
                }
            };
            info.insert(name.clone(), value);
        }
        info
    }
}

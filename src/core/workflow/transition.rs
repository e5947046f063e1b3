#![allow(clippy::result_large_err)] // Selection failures carry the aggregated AppError diagnostics.

use crate::core::error::AppError;
use crate::core::workflow::condition::ConditionEvaluator;
use crate::core::workflow::instance::StageHistory;
use crate::core::workflow::schema::{StageSpec, WorkflowSpecification};
use crate::core::workflow::scope::VariableScopes;
use serde_json::Map;
use tracing::debug;

const NO_TRANSITION_MESSAGE: &str =
    "No valid transition found for the current stage and variables. Reasons: ";

/// Picks the next stage to run using first-match-wins transition selection.
#[derive(Debug, Clone, Default)]
pub struct StageTransitionSelector {
    evaluator: ConditionEvaluator,
}

impl StageTransitionSelector {
    pub fn new(evaluator: ConditionEvaluator) -> Self {
        Self { evaluator }
    }

    /// Select the stage that follows `previous_stage_key`.
    ///
    /// A blank key starts the workflow at its first stage. Otherwise the previous stage's
    /// transitions are evaluated in declaration order with the stage output taken from
    /// `previous_stage_history`; the `stage_output` of `scopes` is ignored. When nothing
    /// matches, the returned not-found error lists every transition and why it was skipped.
    pub fn select_next<'s>(
        &self,
        specification: &'s WorkflowSpecification,
        previous_stage_key: Option<&str>,
        previous_stage_history: Option<&StageHistory>,
        scopes: &VariableScopes<'_>,
    ) -> Result<&'s StageSpec, AppError> {
        let previous_key = match previous_stage_key.map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return specification.first_stage(),
        };

        let previous = specification.stage(previous_key)?;
        let empty = Map::new();
        let stage_output = previous_stage_history
            .map(|history| &history.stage_output)
            .unwrap_or(&empty);
        let scopes = VariableScopes {
            stage_output,
            ..*scopes
        };

        let mut reasons = Vec::with_capacity(previous.transitions.len());
        for transition in &previous.transitions {
            if !self.evaluator.evaluate_compiled(transition.conditions(), &scopes) {
                reasons.push(format!("transition to '{}' didn't match", transition.go_to));
                continue;
            }
            match specification.stage(&transition.go_to) {
                Ok(next) => {
                    debug!(from = %previous.key, to = %next.key, "transition selected");
                    return Ok(next);
                }
                Err(err) => {
                    reasons.push(format!(
                        "transition to '{}' error: {}",
                        transition.go_to, err.message
                    ));
                }
            }
        }

        let mut err = AppError::not_found(format!(
            "{}{}",
            NO_TRANSITION_MESSAGE,
            reasons.join("; ")
        ))
        .with_code("WFS-TRANS-001");
        err.add_context("stageKey", &previous.key);
        Err(err)
    }
}

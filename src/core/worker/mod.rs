//! Job handlers invoked by the external process engine.
//!
//! Every handler takes the job variables and returns the variables to complete the job with.
//! Instance mutations happen on a loaded copy that is saved back wholesale, so callers must
//! not run two handlers for the same workflow concurrently.

#![allow(clippy::result_large_err)] // Handlers surface AppError codes to the process engine.

use crate::core::error::AppError;
use crate::core::store::{require_workflow, SpecificationStore, WorkflowStore};
use crate::core::types::{ErrorCategory, WorkerExecutionStatus};
use crate::core::workflow::{
    ConditionEvaluator, CycleExecutionStatus, MappingApplier, StageExecutionStatus,
    StageTransitionSelector, VariableScopes, Workflow, WorkflowExecutionStatus,
};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

pub const WORKFLOW_SPECIFICATION_ID: &str = "workflowSpecificationId";
pub const WORKFLOW_ID: &str = "workflowId";
pub const CYCLE_ID: &str = "cycleId";
pub const STAGE_KEY: &str = "stageKey";
pub const STAGE_TYPE: &str = "stageType";
pub const STAGE_HISTORY_ID: &str = "stageHistoryId";
pub const STAGE_OUTPUT: &str = "stageOutput";
pub const STAGE_EXECUTION_STATUS: &str = "stageExecutionStatus";
pub const STAGE_EXECUTION_ERROR: &str = "stageExecutionError";
pub const CORRELATION_ID: &str = "correlationId";
pub const CYCLE_EXECUTION_STATUS: &str = "cycleExecutionStatus";
pub const WORKER_EXECUTION_STATUS: &str = "workerExecutionStatus";
pub const WORKER_EXECUTION_ERROR: &str = "workerExecutionError";

/// Job types the process engine dispatches to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    CreateWorkflow,
    CreateCycle,
    StageDecision,
    StagePreProcessing,
    StagePostProcessing,
    CycleCompleteSuccess,
    WorkflowCompleteSuccess,
    FlowCompleteError,
}

impl JobType {
    pub const ALL: [JobType; 8] = [
        JobType::CreateWorkflow,
        JobType::CreateCycle,
        JobType::StageDecision,
        JobType::StagePreProcessing,
        JobType::StagePostProcessing,
        JobType::CycleCompleteSuccess,
        JobType::WorkflowCompleteSuccess,
        JobType::FlowCompleteError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::CreateWorkflow => "create-workflow",
            JobType::CreateCycle => "create-cycle",
            JobType::StageDecision => "stage-decision",
            JobType::StagePreProcessing => "stage-pre-processing",
            JobType::StagePostProcessing => "stage-post-processing",
            JobType::CycleCompleteSuccess => "cycle-complete-success",
            JobType::WorkflowCompleteSuccess => "workflow-complete-success",
            JobType::FlowCompleteError => "flow-complete-error",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        JobType::ALL
            .into_iter()
            .find(|job| job.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("Unknown job type: {}", value),
                )
                .with_code("WFS-JOB-001")
                .with_suggestion(format!(
                    "use one of: {}",
                    JobType::ALL.map(|job| job.as_str()).join(", ")
                ))
            })
    }
}

/// Result variables a failed job is completed with.
pub fn error_result(message: &str) -> Map<String, Value> {
    let mut result = Map::new();
    result.insert(
        WORKER_EXECUTION_STATUS.to_string(),
        json!(WorkerExecutionStatus::Error.as_str()),
    );
    result.insert(WORKER_EXECUTION_ERROR.to_string(), json!(message));
    result
}

/// Read a job variable as a string. Absent and null read as empty, scalars use their JSON text.
pub fn string_var(vars: &Map<String, Value>, key: &str) -> String {
    match vars.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn object_var(vars: &Map<String, Value>, key: &str) -> Map<String, Value> {
    match vars.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Stage lifecycle handlers over a document store.
pub struct StageWorkers<S> {
    store: Arc<S>,
    selector: StageTransitionSelector,
}

impl<S> StageWorkers<S>
where
    S: WorkflowStore + SpecificationStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_evaluator(store, ConditionEvaluator::default())
    }

    pub fn with_evaluator(store: Arc<S>, evaluator: ConditionEvaluator) -> Self {
        Self {
            store,
            selector: StageTransitionSelector::new(evaluator),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run the handler registered for `job_type`.
    pub async fn handle(
        &self,
        job_type: &str,
        vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, AppError> {
        let job: JobType = job_type.parse()?;
        let workflow_id = string_var(vars, WORKFLOW_ID);
        info!(job = %job, workflow_id = %workflow_id, "starting job");

        let outcome = match job {
            JobType::CreateWorkflow => self.create_workflow(vars).await,
            _ => self.run_on_workflow(job, &workflow_id, vars).await,
        };

        match outcome {
            Ok(result) => {
                info!(job = %job, workflow_id = %workflow_id, "job completed");
                Ok(result)
            }
            Err(err) => {
                warn!(job = %job, workflow_id = %workflow_id, error = %err, "job failed");
                self.record_failure(job, &workflow_id, &err).await;
                Err(err)
            }
        }
    }

    async fn create_workflow(
        &self,
        vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, AppError> {
        let specification_id = string_var(vars, WORKFLOW_SPECIFICATION_ID);
        let specification = self
            .store
            .get_specification(&specification_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Workflow specification not found: {}",
                    specification_id
                ))
                .with_code("WFS-SPEC-006")
            })?;

        let mut workflow = Workflow::new(specification, optional(string_var(vars, CORRELATION_ID)));
        workflow.record_worker(WorkerExecutionStatus::Success, None);
        self.store.save(&workflow).await?;

        let mut result = Map::new();
        result.insert(WORKFLOW_ID.to_string(), json!(workflow.id));
        Ok(result)
    }

    async fn run_on_workflow(
        &self,
        job: JobType,
        workflow_id: &str,
        vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, AppError> {
        let mut workflow = require_workflow(self.store.as_ref(), workflow_id).await?;
        let result = match job {
            JobType::CreateCycle => create_cycle(&mut workflow),
            JobType::StageDecision => self.stage_decision(&workflow, vars)?,
            JobType::StagePreProcessing => stage_pre_processing(&mut workflow, vars)?,
            JobType::StagePostProcessing => stage_post_processing(&mut workflow, vars)?,
            JobType::CycleCompleteSuccess => {
                workflow
                    .cycle_mut(&string_var(vars, CYCLE_ID))?
                    .complete(CycleExecutionStatus::Completed);
                Map::new()
            }
            JobType::WorkflowCompleteSuccess => {
                workflow.complete(WorkflowExecutionStatus::Completed);
                Map::new()
            }
            JobType::FlowCompleteError => flow_complete_error(&mut workflow, vars)?,
            JobType::CreateWorkflow => {
                return Err(AppError::new(
                    ErrorCategory::InternalError,
                    "create-workflow does not run against an existing workflow",
                ))
            }
        };
        workflow.record_worker(WorkerExecutionStatus::Success, None);
        self.store.save(&workflow).await?;
        Ok(result)
    }

    fn stage_decision(
        &self,
        workflow: &Workflow,
        vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, AppError> {
        let previous_key = string_var(vars, STAGE_KEY);
        let next = if previous_key.is_empty() {
            workflow.specification.first_stage()?
        } else {
            // Transitions read the recorded output of the previous stage.
            let cycle = workflow.cycle(&string_var(vars, CYCLE_ID))?;
            let history = cycle.stage_history(&string_var(vars, STAGE_HISTORY_ID))?;
            let empty = Map::new();
            let scopes = VariableScopes::new(&workflow.context, &cycle.context, vars, &empty);
            self.selector.select_next(
                &workflow.specification,
                Some(previous_key.as_str()),
                Some(history),
                &scopes,
            )?
        };

        let mut result = Map::new();
        result.insert(STAGE_KEY.to_string(), json!(next.key));
        result.insert(STAGE_TYPE.to_string(), json!(next.stage_type));
        Ok(result)
    }

    /// Record an `Error` worker entry for a failed job. Failures here are only logged since
    /// the original error is what the caller needs.
    async fn record_failure(&self, job: JobType, workflow_id: &str, err: &AppError) {
        if workflow_id.is_empty() {
            return;
        }
        let message = format!("{} job failed. error={}", job, err.message);
        let recorded = async {
            let Some(mut workflow) = self.store.get_one(workflow_id).await? else {
                return Ok(());
            };
            workflow.record_worker(WorkerExecutionStatus::Error, Some(message));
            self.store.save(&workflow).await
        };
        if let Err(record_err) = recorded.await {
            warn!(
                workflow_id = %workflow_id,
                error = %record_err,
                "failed to record worker error history"
            );
        }
    }
}

fn create_cycle(workflow: &mut Workflow) -> Map<String, Value> {
    let cycle = workflow.start_cycle();
    let mut result = Map::new();
    result.insert(CYCLE_ID.to_string(), json!(cycle.id));
    result.insert(
        CYCLE_EXECUTION_STATUS.to_string(),
        serde_json::to_value(cycle.execution_status).unwrap_or(Value::Null),
    );
    result
}

fn stage_pre_processing(
    workflow: &mut Workflow,
    vars: &Map<String, Value>,
) -> Result<Map<String, Value>, AppError> {
    let cycle_id = string_var(vars, CYCLE_ID);
    let stage = workflow.specification.stage(&string_var(vars, STAGE_KEY))?.clone();

    let input = {
        let cycle = workflow.cycle(&cycle_id)?;
        let empty = Map::new();
        let scopes = VariableScopes::new(&workflow.context, &cycle.context, vars, &empty);
        let mut input = workflow.specification.context.clone();
        input.extend(MappingApplier::build_input(&stage.input_mapping, &scopes));
        input
    };

    let history = workflow.cycle_mut(&cycle_id)?.begin_stage(&stage, input);
    let mut result = Map::new();
    result.insert(STAGE_HISTORY_ID.to_string(), json!(history.id));
    result.insert(
        STAGE_EXECUTION_STATUS.to_string(),
        json!(history.execution_status.as_str()),
    );
    result.insert(STAGE_EXECUTION_ERROR.to_string(), json!(""));
    Ok(result)
}

fn stage_post_processing(
    workflow: &mut Workflow,
    vars: &Map<String, Value>,
) -> Result<Map<String, Value>, AppError> {
    let cycle_id = string_var(vars, CYCLE_ID);
    let status: StageExecutionStatus = string_var(vars, STAGE_EXECUTION_STATUS).parse()?;
    let stage_output = object_var(vars, STAGE_OUTPUT);

    let stage = workflow.specification.stage(&string_var(vars, STAGE_KEY))?.clone();
    workflow
        .stage_history_mut(&cycle_id, &string_var(vars, STAGE_HISTORY_ID))?
        .finish(
            status,
            stage_output.clone(),
            optional(string_var(vars, STAGE_EXECUTION_ERROR)),
        );

    let (workflow_context, cycle_context) = workflow.contexts_mut(&cycle_id)?;
    Ok(MappingApplier::apply_output(
        &stage.output_mapping,
        workflow_context,
        cycle_context,
        vars,
        &stage_output,
    ))
}

fn flow_complete_error(
    workflow: &mut Workflow,
    vars: &Map<String, Value>,
) -> Result<Map<String, Value>, AppError> {
    let cycle_id = string_var(vars, CYCLE_ID);
    if !cycle_id.is_empty() {
        workflow
            .cycle_mut(&cycle_id)?
            .complete(CycleExecutionStatus::Error);
    }
    workflow.complete(WorkflowExecutionStatus::Error);
    Ok(Map::new())
}

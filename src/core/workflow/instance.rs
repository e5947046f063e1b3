#![allow(clippy::result_large_err)] // Instance lookups surface AppError not-found diagnostics directly.

use crate::core::error::AppError;
use crate::core::types::WorkerExecutionStatus;
use crate::core::workflow::schema::{StageSpec, WorkflowSpecification};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Lifecycle status of a workflow instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowExecutionStatus {
    #[default]
    InProgress,
    Completed,
    Error,
}

/// Lifecycle status of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleExecutionStatus {
    #[default]
    InProgress,
    Completed,
    Error,
}

/// Status of a single stage execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageExecutionStatus {
    #[default]
    Initialized,
    InProgress,
    Success,
    Error,
}

impl StageExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageExecutionStatus::Initialized => "INITIALIZED",
            StageExecutionStatus::InProgress => "IN_PROGRESS",
            StageExecutionStatus::Success => "SUCCESS",
            StageExecutionStatus::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for StageExecutionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INITIALIZED" => Ok(StageExecutionStatus::Initialized),
            "IN_PROGRESS" => Ok(StageExecutionStatus::InProgress),
            "SUCCESS" => Ok(StageExecutionStatus::Success),
            "ERROR" => Ok(StageExecutionStatus::Error),
            other => Err(AppError::new(
                crate::core::types::ErrorCategory::ValidationError,
                format!("unknown stage execution status '{}'", other),
            )),
        }
    }
}

/// One process execution of a specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub specification: WorkflowSpecification,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub execution_status: WorkflowExecutionStatus,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub worker_history: Vec<WorkerHistory>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

/// One repeatable round of the stage sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: String,
    #[serde(default)]
    pub execution_status: CycleExecutionStatus,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub stages_history: Vec<StageHistory>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Append-only record of one stage execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHistory {
    pub id: String,
    pub stage_key: String,
    #[serde(default)]
    pub stage_type: String,
    #[serde(default)]
    pub execution_status: StageExecutionStatus,
    #[serde(default)]
    pub stage_input: Map<String, Value>,
    #[serde(default)]
    pub stage_output: Map<String, Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Audit entry written after every job handler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerHistory {
    pub status: WorkerExecutionStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Workflow {
    /// Create an in-progress instance whose workflow context starts as a copy of the
    /// specification context.
    pub fn new(specification: WorkflowSpecification, correlation_id: Option<String>) -> Self {
        Workflow {
            id: new_id(),
            context: specification.context.clone(),
            specification,
            correlation_id,
            execution_status: WorkflowExecutionStatus::InProgress,
            cycles: Vec::new(),
            worker_history: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Append a new in-progress cycle and return it.
    pub fn start_cycle(&mut self) -> &mut Cycle {
        self.cycles.push(Cycle {
            id: new_id(),
            execution_status: CycleExecutionStatus::InProgress,
            context: Map::new(),
            stages_history: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
        });
        let last = self.cycles.len() - 1;
        &mut self.cycles[last]
    }

    pub fn cycle(&self, cycle_id: &str) -> Result<&Cycle, AppError> {
        self.cycles
            .iter()
            .find(|cycle| cycle.id.eq_ignore_ascii_case(cycle_id))
            .ok_or_else(|| cycle_not_found(cycle_id))
    }

    pub fn cycle_mut(&mut self, cycle_id: &str) -> Result<&mut Cycle, AppError> {
        self.cycles
            .iter_mut()
            .find(|cycle| cycle.id.eq_ignore_ascii_case(cycle_id))
            .ok_or_else(|| cycle_not_found(cycle_id))
    }

    pub fn stage_history(
        &self,
        cycle_id: &str,
        stage_history_id: &str,
    ) -> Result<&StageHistory, AppError> {
        self.cycle(cycle_id)?.stage_history(stage_history_id)
    }

    pub fn stage_history_mut(
        &mut self,
        cycle_id: &str,
        stage_history_id: &str,
    ) -> Result<&mut StageHistory, AppError> {
        self.cycle_mut(cycle_id)?.stage_history_mut(stage_history_id)
    }

    /// The workflow context and one cycle's context, both writable.
    pub fn contexts_mut(
        &mut self,
        cycle_id: &str,
    ) -> Result<(&mut Map<String, Value>, &mut Map<String, Value>), AppError> {
        let cycle = self
            .cycles
            .iter_mut()
            .find(|cycle| cycle.id.eq_ignore_ascii_case(cycle_id))
            .ok_or_else(|| cycle_not_found(cycle_id))?;
        Ok((&mut self.context, &mut cycle.context))
    }

    /// Close the instance with the given status.
    pub fn complete(&mut self, status: WorkflowExecutionStatus) {
        self.execution_status = status;
        self.ended_at = Some(Utc::now());
    }

    pub fn record_worker(&mut self, status: WorkerExecutionStatus, error: Option<String>) {
        self.worker_history.push(WorkerHistory {
            status,
            error,
            recorded_at: Utc::now(),
        });
    }
}

impl Cycle {
    pub fn stage_history(&self, stage_history_id: &str) -> Result<&StageHistory, AppError> {
        self.stages_history
            .iter()
            .find(|history| history.id.eq_ignore_ascii_case(stage_history_id))
            .ok_or_else(|| stage_history_not_found(stage_history_id))
    }

    pub fn stage_history_mut(
        &mut self,
        stage_history_id: &str,
    ) -> Result<&mut StageHistory, AppError> {
        self.stages_history
            .iter_mut()
            .find(|history| history.id.eq_ignore_ascii_case(stage_history_id))
            .ok_or_else(|| stage_history_not_found(stage_history_id))
    }

    /// Append an `Initialized` history entry for `stage` and return it.
    pub fn begin_stage(&mut self, stage: &StageSpec, input: Map<String, Value>) -> &StageHistory {
        self.stages_history.push(StageHistory {
            id: new_id(),
            stage_key: stage.key.clone(),
            stage_type: stage.stage_type.clone(),
            execution_status: StageExecutionStatus::Initialized,
            stage_input: input,
            stage_output: Map::new(),
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        });
        let last = self.stages_history.len() - 1;
        &self.stages_history[last]
    }

    pub fn complete(&mut self, status: CycleExecutionStatus) {
        self.execution_status = status;
        self.finished_at = Some(Utc::now());
    }
}

impl StageHistory {
    /// Record the outcome of the stage.
    pub fn finish(
        &mut self,
        status: StageExecutionStatus,
        output: Map<String, Value>,
        error: Option<String>,
    ) {
        self.execution_status = status;
        self.stage_output = output;
        self.error = error.filter(|message| !message.is_empty());
        self.ended_at = Some(Utc::now());
    }
}

fn cycle_not_found(cycle_id: &str) -> AppError {
    AppError::not_found(format!("Cycle not found: {}", cycle_id)).with_code("WFS-CYCLE-001")
}

fn stage_history_not_found(stage_history_id: &str) -> AppError {
    AppError::not_found(format!("Stage history not found: {}", stage_history_id))
        .with_code("WFS-HIST-001")
}

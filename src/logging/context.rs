use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Commands a developer runs by hand: `validate`, `eval`.
    LocalDev,
    /// Job handlers driven by the process engine; stdout carries result variables.
    Worker,
}

impl ExecutionContext {
    /// Returns `true` when console sinks should be disabled by default.
    pub fn disables_console(self) -> bool {
        matches!(self, ExecutionContext::Worker)
    }
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if worker_override_enabled() {
        return ExecutionContext::Worker;
    }

    match command {
        Command::Job(_) => ExecutionContext::Worker,
        Command::Validate(_) | Command::Eval(_) => ExecutionContext::LocalDev,
    }
}

fn worker_override_enabled() -> bool {
    env::var("STAGEFLOW_WORKER")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}

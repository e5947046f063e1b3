use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    NotFound,
    StoreError,
    SerializationError,
    IoError,
    ConfigError,
    InternalError,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Info,
}

/// Outcome of a single job handler run, recorded on the workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerExecutionStatus {
    Success,
    Error,
}

impl WorkerExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerExecutionStatus::Success => "SUCCESS",
            WorkerExecutionStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for WorkerExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

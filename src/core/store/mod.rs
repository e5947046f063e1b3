//! Document-store collaborators for workflow instances and specifications.

#![allow(clippy::result_large_err)] // Store traits return AppError so callers keep error codes.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::InMemoryStore;

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::{Workflow, WorkflowSpecification};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Persistence of workflow instances. Callers serialize writes per instance.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get_one(&self, id: &str) -> Result<Option<Workflow>, AppError>;
    async fn save(&self, workflow: &Workflow) -> Result<(), AppError>;
}

/// Read access to workflow specifications.
#[async_trait]
pub trait SpecificationStore: Send + Sync {
    async fn get_specification(&self, id: &str)
        -> Result<Option<WorkflowSpecification>, AppError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid document id '{0}'")]
    InvalidId(String),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("failed to encode workflow {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let category = match &err {
            StoreError::InvalidId(_) => ErrorCategory::ValidationError,
            StoreError::Io { .. } => ErrorCategory::StoreError,
            StoreError::Decode { .. } | StoreError::Encode { .. } => {
                ErrorCategory::SerializationError
            }
        };
        let message = err.to_string();
        AppError::with_source(category, message, Box::new(err)).with_code("WFS-STORE-001")
    }
}

/// Fetch a workflow that must exist.
pub async fn require_workflow<S>(store: &S, id: &str) -> Result<Workflow, AppError>
where
    S: WorkflowStore + ?Sized,
{
    store.get_one(id).await?.ok_or_else(|| {
        AppError::not_found(format!("Workflow not found: {}", id)).with_code("WFS-WF-001")
    })
}

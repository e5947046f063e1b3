//! In-memory store used by tests and embedding callers.

use super::{SpecificationStore, WorkflowStore};
use crate::core::error::AppError;
use crate::core::workflow::{Workflow, WorkflowSpecification};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    workflows: DashMap<String, Workflow>,
    specifications: DashMap<String, WorkflowSpecification>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specification under its own id.
    pub fn insert_specification(&self, specification: WorkflowSpecification) {
        self.specifications
            .insert(specification.id.clone(), specification);
    }

    pub fn workflow_count(&self) -> usize {
        self.workflows.len()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn get_one(&self, id: &str) -> Result<Option<Workflow>, AppError> {
        Ok(self.workflows.get(id).map(|entry| entry.clone()))
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), AppError> {
        self.workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }
}

#[async_trait]
impl SpecificationStore for InMemoryStore {
    async fn get_specification(
        &self,
        id: &str,
    ) -> Result<Option<WorkflowSpecification>, AppError> {
        Ok(self.specifications.get(id).map(|entry| entry.clone()))
    }
}

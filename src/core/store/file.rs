//! File-backed store rooted at a directory.
//!
//! Layout:
//! - `<root>/workflows/<id>.json` for instances
//! - `<root>/specifications/<id>.{yaml,yml,json}` for specifications

use super::{SpecificationStore, StoreError, WorkflowStore};
use crate::core::error::AppError;
use crate::core::workflow::{Workflow, WorkflowSpecification};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const SPECIFICATION_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join("workflows")
    }

    pub fn specifications_dir(&self) -> PathBuf {
        self.root.join("specifications")
    }

    fn workflow_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.workflows_dir().join(format!("{}.json", checked_id(id)?)))
    }
}

/// Ids become file names, so anything that could escape the store directory is refused.
fn checked_id(id: &str) -> Result<&str, StoreError> {
    let trimmed = id.trim();
    let unsafe_id = trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\'])
        || trimmed.contains("..");
    if unsafe_id {
        Err(StoreError::InvalidId(id.to_string()))
    } else {
        Ok(trimmed)
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let io_error = |path: &Path, source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| io_error(parent, err))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, data)
        .await
        .map_err(|err| io_error(&tmp_path, err))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|err| io_error(path, err))
}

#[async_trait]
impl WorkflowStore for FileStore {
    async fn get_one(&self, id: &str) -> Result<Option<Workflow>, AppError> {
        let path = self.workflow_path(id)?;
        let Some(text) = read_optional(&path).await? else {
            return Ok(None);
        };
        let workflow = serde_json::from_str(&text).map_err(|err| StoreError::Decode {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        Ok(Some(workflow))
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), AppError> {
        let path = self.workflow_path(&workflow.id)?;
        let content = serde_json::to_vec_pretty(workflow).map_err(|source| StoreError::Encode {
            id: workflow.id.clone(),
            source,
        })?;
        atomic_write(&path, &content).await?;
        debug!(workflow_id = %workflow.id, path = %path.display(), "workflow saved");
        Ok(())
    }
}

#[async_trait]
impl SpecificationStore for FileStore {
    async fn get_specification(
        &self,
        id: &str,
    ) -> Result<Option<WorkflowSpecification>, AppError> {
        let id = checked_id(id)?;
        for extension in SPECIFICATION_EXTENSIONS {
            let path = self.specifications_dir().join(format!("{}.{}", id, extension));
            let Some(text) = read_optional(&path).await? else {
                continue;
            };
            let parsed = if extension == "json" {
                serde_json::from_str::<WorkflowSpecification>(&text).map_err(|e| e.to_string())
            } else {
                serde_yaml::from_str::<WorkflowSpecification>(&text).map_err(|e| e.to_string())
            };
            let mut specification =
                parsed.map_err(|reason| StoreError::Decode { path, reason })?;
            if specification.id.is_empty() {
                specification.id = id.to_string();
            }
            return Ok(Some(specification));
        }
        Ok(None)
    }
}

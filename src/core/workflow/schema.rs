#![allow(clippy::result_large_err)] // Specification APIs return AppError to keep validation codes and context.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::condition::ConditionSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Immutable workflow template: ordered stages plus the context seed for stage input.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpecification {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

/// One stage of a specification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSpec {
    pub key: String,
    #[serde(rename = "type", default)]
    pub stage_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_first_stage: bool,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Destination field name to source expression.
    #[serde(default)]
    pub input_mapping: IndexMap<String, Value>,
    /// Destination expression to source expression.
    #[serde(default)]
    pub output_mapping: IndexMap<String, Value>,
}

impl StageSpec {
    pub fn matches_key(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

/// Guarded edge to a candidate next stage. The `on` map is compiled into a [`ConditionSet`]
/// when the document is loaded, so operator tags are resolved once.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "TransitionDocument", into = "TransitionDocument")]
pub struct Transition {
    pub on: Map<String, Value>,
    pub go_to: String,
    conditions: ConditionSet,
}

impl Transition {
    pub fn new(on: Map<String, Value>, go_to: impl Into<String>) -> Self {
        let conditions = ConditionSet::compile(&on);
        Self {
            on,
            go_to: go_to.into(),
            conditions,
        }
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }
}

/// Serialized shape of a [`Transition`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransitionDocument {
    #[serde(default)]
    on: Map<String, Value>,
    go_to: String,
}

impl From<TransitionDocument> for Transition {
    fn from(document: TransitionDocument) -> Self {
        Transition::new(document.on, document.go_to)
    }
}

impl From<Transition> for TransitionDocument {
    fn from(transition: Transition) -> Self {
        TransitionDocument {
            on: transition.on,
            go_to: transition.go_to,
        }
    }
}

/// Knobs that control how strict specification validation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSettings {
    pub reject_unknown_operators: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            reject_unknown_operators: true,
        }
    }
}

impl WorkflowSpecification {
    /// Load a specification from YAML (`.yaml`/`.yml`) or JSON and validate it.
    pub fn load_from_file(path: &Path, settings: &ValidationSettings) -> Result<Self, AppError> {
        let spec = Self::parse_file(path)?;
        spec.validate(settings)?;
        Ok(spec)
    }

    /// Parse a specification file without validating it.
    pub fn parse_file(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", path.display(), err),
            )
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let parsed = if is_yaml {
            serde_yaml::from_str::<WorkflowSpecification>(&text).map_err(|err| err.to_string())
        } else {
            serde_json::from_str::<WorkflowSpecification>(&text).map_err(|err| err.to_string())
        };
        parsed.map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("failed to parse {}: {}", path.display(), err),
            )
            .with_code("WFS-SPEC-000")
        })
    }

    /// Locate a stage by key (case-insensitive).
    pub fn stage(&self, key: &str) -> Result<&StageSpec, AppError> {
        self.stages
            .iter()
            .find(|stage| stage.matches_key(key))
            .ok_or_else(|| {
                AppError::not_found(format!("Stage not found: {}", key)).with_code("WFS-STAGE-002")
            })
    }

    /// The unique stage flagged `isFirstStage`. Zero or several flagged stages is a malformed
    /// specification.
    pub fn first_stage(&self) -> Result<&StageSpec, AppError> {
        let mut flagged = self.stages.iter().filter(|stage| stage.is_first_stage);
        match (flagged.next(), flagged.next()) {
            (Some(stage), None) => Ok(stage),
            (None, _) => Err(AppError::not_found(
                "First stage not found in workflow specification",
            )
            .with_code("WFS-STAGE-001")),
            (Some(first), Some(second)) => Err(AppError::not_found(format!(
                "First stage is ambiguous in workflow specification: '{}' and '{}' are both flagged",
                first.key, second.key
            ))
            .with_code("WFS-STAGE-001")),
        }
    }

    /// Validate structural invariants of the specification.
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), AppError> {
        if self.stages.is_empty() {
            return Err(invalid("specification must define at least one stage", "WFS-SPEC-001"));
        }

        let mut keys = HashSet::new();
        for stage in &self.stages {
            if stage.key.trim().is_empty() {
                return Err(invalid("stage key must not be blank", "WFS-SPEC-002"));
            }
            if !keys.insert(stage.key.to_ascii_lowercase()) {
                return Err(invalid(
                    format!("duplicate stage key: {}", stage.key),
                    "WFS-SPEC-002",
                ));
            }
        }

        let first_count = self.stages.iter().filter(|s| s.is_first_stage).count();
        if first_count != 1 {
            return Err(invalid(
                format!(
                    "exactly one stage must set isFirstStage, found {}",
                    first_count
                ),
                "WFS-SPEC-003",
            ));
        }

        for stage in &self.stages {
            for transition in &stage.transitions {
                if !keys.contains(&transition.go_to.to_ascii_lowercase()) {
                    return Err(invalid(
                        format!(
                            "stage '{}' has a transition to unknown stage '{}'",
                            stage.key, transition.go_to
                        ),
                        "WFS-SPEC-004",
                    ));
                }
                if settings.reject_unknown_operators {
                    if let Some(problem) = transition.conditions().problems().into_iter().next() {
                        return Err(invalid(
                            format!(
                                "stage '{}' transition to '{}': {}",
                                stage.key, transition.go_to, problem
                            ),
                            "WFS-SPEC-005",
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn invalid<T: Into<String>>(message: T, code: &str) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message).with_code(code)
}

use crate::core::workflow::condition::{ConditionEvaluator, DEFAULT_MAX_REFERENCE_DEPTH};
use crate::core::workflow::schema::ValidationSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration loaded from stageflow.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StageflowConfig {
    /// Specification validation
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Variable resolution limits
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Document store location
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Reject specifications whose conditions use unknown operators or invalid regexes
    #[serde(default = "default_reject_unknown_operators")]
    pub reject_unknown_operators: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How many `$` references an expected value may chain through
    #[serde(default = "default_max_reference_depth")]
    pub max_reference_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the file store
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

fn default_reject_unknown_operators() -> bool {
    true
}

fn default_max_reference_depth() -> usize {
    DEFAULT_MAX_REFERENCE_DEPTH
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".stageflow")
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            reject_unknown_operators: default_reject_unknown_operators(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_reference_depth: default_max_reference_depth(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: default_store_root(),
        }
    }
}

impl StageflowConfig {
    pub fn validation_settings(&self) -> ValidationSettings {
        ValidationSettings {
            reject_unknown_operators: self.validation.reject_unknown_operators,
        }
    }

    pub fn evaluator(&self) -> ConditionEvaluator {
        ConditionEvaluator::new(self.resolver.max_reference_depth)
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

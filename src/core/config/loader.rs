#![allow(clippy::result_large_err)]

use super::{ConfigValidator, StageflowConfig};
use crate::core::error::AppError;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "stageflow.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/stageflow.toml)
    /// Environment variables override config file values
    /// A missing file falls back to defaults + env vars
    pub fn load_from_workspace(workspace_path: &Path) -> Result<StageflowConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load an explicitly named config file, which must exist.
    pub fn load_explicit(path: &Path) -> Result<StageflowConfig, AppError> {
        let mut config = Self::load_from_file(path)?.ok_or_else(|| {
            AppError::new(
                crate::core::types::ErrorCategory::ConfigError,
                format!("Config file not found: {}", path.display()),
            )
        })?;
        Self::apply_env_overrides(&mut config);
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<StageflowConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: StageflowConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    /// Unparsable values are ignored
    fn apply_env_overrides(config: &mut StageflowConfig) {
        if let Ok(reject) = env::var("STAGEFLOW_REJECT_UNKNOWN_OPERATORS") {
            if let Ok(reject) = reject.trim().parse::<bool>() {
                config.validation.reject_unknown_operators = reject;
            }
        }

        if let Ok(depth) = env::var("STAGEFLOW_MAX_REFERENCE_DEPTH") {
            if let Ok(depth) = depth.trim().parse::<usize>() {
                config.resolver.max_reference_depth = depth;
            }
        }

        if let Ok(root) = env::var("STAGEFLOW_STORE_ROOT") {
            config.store.root = PathBuf::from(root);
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "STAGEFLOW_REJECT_UNKNOWN_OPERATORS - Reject unknown condition operators at validation (true/false, default: true)",
            "STAGEFLOW_MAX_REFERENCE_DEPTH - Maximum chained $ references in an expected value (default: 16)",
            "STAGEFLOW_STORE_ROOT - Root directory of the file store (default: .stageflow)",
        ]
    }

    /// Validate configuration values
    pub fn validate_config(config: &StageflowConfig) -> Result<(), AppError> {
        ConfigValidator::validate(config)
    }
}

#![allow(clippy::result_large_err)]

use super::StageflowConfig;
use crate::core::error::AppError;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &StageflowConfig) -> Result<(), AppError> {
        if config.resolver.max_reference_depth == 0 {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::ConfigError,
                "resolver.max_reference_depth must be at least 1",
            )
            .with_code("WFS-CONFIG-001"));
        }

        if config.store.root.as_os_str().is_empty() {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::ConfigError,
                "store.root cannot be empty",
            )
            .with_code("WFS-CONFIG-002"));
        }

        Ok(())
    }
}

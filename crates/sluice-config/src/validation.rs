// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for daemon settings.

use crate::diagnostic::ConfigError;
use crate::model::GlobalConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate daemon settings, collecting every failure.
pub fn validate_globals(config: &GlobalConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.pool_size == 0 {
        errors.push(ConfigError::Validation {
            message: "sluiced.pool_size must be at least 1".to_string(),
        });
    }

    if config.plugin_chan_size == 0 {
        errors.push(ConfigError::Validation {
            message: "sluiced.plugin_chan_size must be at least 1".to_string(),
        });
    }

    if config.max_msg_loops == 0 {
        errors.push(ConfigError::Validation {
            message: "sluiced.max_msg_loops must be at least 1".to_string(),
        });
    }

    if config.hostname.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "sluiced.hostname must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "sluiced.log_level `{}` is not one of {}",
                config.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

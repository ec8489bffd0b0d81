//! Configuration System
//!
//! Layered configuration for the sensor session, the admission queue and
//! logging. Sources are merged in order: built-in defaults, the global config
//! file, an explicit file passed by the caller, then `CALLGATE__*` environment
//! variables.

use crate::error::GateError;
use crate::logging::LoggingConfig;
use crate::queue::QueueConfig;
use crate::sensor::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge;
mod sources;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Session(String),
    Queue(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Session(msg) => write!(f, "Session: {}", msg),
            ValidationError::Queue(msg) => write!(f, "Queue: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl GateConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.session.validate() {
            errors.push(ValidationError::Session(e));
        }
        if let Err(e) = self.queue.validate() {
            errors.push(ValidationError::Queue(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`GateConfig`] from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, `explicit` (which must exist when
    /// given) and environment overrides, then validate the result.
    pub fn load(explicit: Option<&Path>) -> Result<GateConfig, GateError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        if let Some(path) = explicit {
            builder = sources::explicit_file::add_to_builder(builder, path)?;
        }
        builder = sources::env::add_to_builder(builder);

        let config: GateConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    /// Load a single file on top of the defaults, ignoring the global file
    /// and the environment.
    pub fn load_from_file(path: &Path) -> Result<GateConfig, GateError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::explicit_file::add_to_builder(builder, path)?;
        let config: GateConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    /// Location of the global config file, if a home directory is known.
    pub fn global_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }

    fn validated(config: GateConfig) -> Result<GateConfig, GateError> {
        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            GateError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        debug!(
            connect_timeout_ms = config.session.connect_timeout_ms,
            max_pending = config.queue.max_pending,
            "Configuration loaded"
        );
        Ok(config)
    }
}

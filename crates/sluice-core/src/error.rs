// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sluice pipeline.

use thiserror::Error;

use crate::traits::PluginError;
use crate::types::PluginCategory;

/// The primary error type used across plugin construction, configuration
/// loading, and runner lifecycle operations.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// A section referenced a plugin type that no factory is registered for.
    #[error("no registered plugin type: {0}")]
    UnknownPluginType(String),

    /// The plugin type name does not end in a known category suffix.
    #[error("unrecognized plugin category for type '{plugin_type}'")]
    UnrecognizedCategory { plugin_type: String },

    /// A section contained a key that neither the plugin schema nor the
    /// common settings recognize.
    #[error("unknown config setting for '{plugin}': {key}")]
    UnknownConfigKey {
        plugin: String,
        key: String,
        suggestion: Option<String>,
    },

    /// The plugin rejected its decoded configuration.
    #[error("initialization failed for '{plugin}': {source}")]
    InitializationFailed {
        plugin: String,
        #[source]
        source: PluginError,
    },

    /// A runner was requested for an encoder.
    #[error("encoder plugins don't support runners (requested for '{plugin}')")]
    EncodersNotRunnable { plugin: String },

    /// Multi-decoders reference each other in a loop.
    #[error("cyclic multi-decoder dependency: {cycle}")]
    CyclicDependency { cycle: String },

    /// An opening `%ENV[` was never closed.
    #[error("missing closing delimiter")]
    MissingDelimiter,

    /// An `%ENV[...]` variable name contains whitespace or a nested opener.
    #[error("invalid characters in environment variable")]
    InvalidVariableName,

    /// A runner could not be started.
    #[error("runner '{runner}' failed to start: {reason}")]
    RunnerStartFailed { runner: String, reason: String },

    /// A section value could not be decoded into its target shape.
    #[error("can't decode config for '{plugin}': {message}")]
    InvalidConfig { plugin: String, message: String },

    /// The registered factory produced a plugin of another category.
    #[error("plugin '{plugin}' of type '{plugin_type}' is not a {expected} plugin")]
    CategoryMismatch {
        plugin: String,
        plugin_type: String,
        expected: PluginCategory,
    },

    /// A message matcher expression could not be parsed.
    #[error("invalid message matcher '{expression}': {reason}")]
    InvalidMatcher { expression: String, reason: String },

    /// The configuration text is not a valid document.
    #[error("error decoding config file: {0}")]
    ConfigParse(String),

    /// Aggregate failure of a configuration load.
    #[error("{count} errors loading plugins")]
    LoadFailed { count: usize },

    /// A runner was added under a name that is already live.
    #[error("a {category} runner named '{name}' is already registered")]
    DuplicateRunner {
        category: PluginCategory,
        name: String,
    },

    /// Reading configuration from disk failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

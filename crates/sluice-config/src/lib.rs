// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Sluice pipeline.
//!
//! Provides `%ENV[...]` preprocessing of raw configuration text, parsing into
//! ordered sections, the common settings every plugin section shares, and
//! strict loading of the `[sluiced]` daemon settings with diagnostic error
//! rendering and typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! let globals = sluice_config::load_globals_from_path(Path::new("sluice.toml"))
//!     .expect("config errors");
//! println!("pool size: {}", globals.pool_size);
//! ```

pub mod diagnostic;
pub mod document;
pub mod envsub;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use document::{ConfigDocument, DAEMON_SECTION};
pub use envsub::{env_sub, env_sub_with, replace_envs_file};
pub use loader::{default_config_path, load_globals};
pub use model::{CommonConfig, CommonFoConfig, CommonInputConfig, GlobalConfig, RetryOptions};

/// Load and validate daemon settings from preprocessed configuration text.
pub fn load_globals_from_str(text: &str) -> Result<GlobalConfig, Vec<ConfigError>> {
    load_globals_with_source(text, "<inline>")
}

/// Read, preprocess, and load daemon settings from a configuration file.
pub fn load_globals_from_path(path: &Path) -> Result<GlobalConfig, Vec<ConfigError>> {
    let text = replace_envs_file(path).map_err(|e| vec![ConfigError::Other(e.to_string())])?;
    load_globals_with_source(&text, &path.display().to_string())
}

fn load_globals_with_source(text: &str, origin: &str) -> Result<GlobalConfig, Vec<ConfigError>> {
    let document =
        ConfigDocument::parse(text).map_err(|e| vec![ConfigError::Other(e.to_string())])?;
    match loader::load_globals(document.daemon()) {
        Ok(config) => {
            validation::validate_globals(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, Some((origin, text)))),
    }
}

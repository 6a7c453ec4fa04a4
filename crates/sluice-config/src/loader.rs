// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daemon settings loader using figment for layered merging.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. The `[sluiced]` section of the configuration document
//! 3. `SLUICE_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Serialized};

use tracing::debug;

use crate::model::GlobalConfig;

const ENV_KEYS: &[&str] = &[
    "pool_size",
    "plugin_chan_size",
    "max_msg_loops",
    "hostname",
    "log_level",
];

/// Build the figment for daemon settings.
pub fn build_figment(daemon: Option<&toml::Table>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(GlobalConfig::default()));
    if let Some(section) = daemon {
        figment = figment.merge(Serialized::defaults(section));
    }
    figment.merge(env_provider())
}

/// Extract daemon settings from the `[sluiced]` section plus environment.
pub fn load_globals(daemon: Option<&toml::Table>) -> Result<GlobalConfig, figment::Error> {
    build_figment(daemon).extract()
}

/// `SLUICE_POOL_SIZE` maps to `pool_size`; other `SLUICE_*` variables are
/// left alone.
fn env_provider() -> Env {
    Env::prefixed("SLUICE_").only(ENV_KEYS)
}

/// Locate the configuration file when none is given on the command line.
///
/// Checks `./sluice.toml`, then `~/.config/sluice/sluice.toml`, then
/// `/etc/sluice/sluice.toml`, returning the first that exists.
pub fn default_config_path() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from("sluice.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("sluice/sluice.toml"));
    }
    candidates.push(PathBuf::from("/etc/sluice/sluice.toml"));
    let found = candidates.into_iter().find(|path| path.is_file());
    if let Some(path) = &found {
        debug!(path = %path.display(), "found configuration file");
    }
    found
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration models shared by every plugin section and the daemon.
//!
//! Common settings are decoded leniently from a section (plugin-specific
//! keys are simply ignored), while [`GlobalConfig`] rejects unknown keys.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sluice_core::{PluginCategory, PluginDefaults};

/// Keys every section may carry.
pub const COMMON_KEYS: &[&str] = &["type"];

/// Keys consumed by the input common config.
pub const INPUT_KEYS: &[&str] = &[
    "type",
    "ticker_interval",
    "decoder",
    "synchronous_decode",
    "send_decode_failures",
    "retries",
];

/// Keys consumed by the filter/output common config.
pub const FO_KEYS: &[&str] = &[
    "type",
    "ticker_interval",
    "message_matcher",
    "message_signer",
    "can_exit",
    "retries",
    "encoder",
    "use_framing",
];

/// The framework-owned keys a plugin schema must tolerate for `category`.
pub fn consumed_keys(category: PluginCategory) -> &'static [&'static str] {
    match category {
        PluginCategory::Input => INPUT_KEYS,
        PluginCategory::Filter | PluginCategory::Output => FO_KEYS,
        PluginCategory::Decoder | PluginCategory::Encoder => COMMON_KEYS,
    }
}

/// Decode a lenient view of `section` into `T`.
pub fn from_section<T: DeserializeOwned>(section: &toml::Table) -> Result<T, toml::de::Error> {
    toml::Value::Table(section.clone()).try_into()
}

/// Settings shared by every plugin section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommonConfig {
    /// Registered plugin type. Defaults to the section name.
    #[serde(default, rename = "type")]
    pub plugin_type: Option<String>,
}

/// Restart policy for runners whose plugin exits with an error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryOptions {
    /// Upper bound on the backoff delay.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Starting delay, doubled after every failed restart.
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Random extra delay added to every wait.
    #[serde(with = "humantime_serde")]
    pub max_jitter: Duration,
    /// Maximum restarts; `-1` retries forever.
    pub max_retries: i64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_delay: Duration::from_secs(30),
            delay: Duration::from_millis(250),
            max_jitter: Duration::from_millis(500),
            max_retries: -1,
        }
    }
}

/// Settings shared by input sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommonInputConfig {
    /// Seconds between ticks; 0 disables the ticker.
    #[serde(default)]
    pub ticker_interval: u64,
    /// Decoder section to run on produced messages.
    #[serde(default)]
    pub decoder: String,
    /// Decode on the input task instead of a decoder runner.
    #[serde(default)]
    pub synchronous_decode: Option<bool>,
    /// Forward messages that failed to decode.
    #[serde(default)]
    pub send_decode_failures: Option<bool>,
    /// Restart policy for a failing input.
    #[serde(default)]
    pub retries: RetryOptions,
}

impl CommonInputConfig {
    /// Fill fields the user left unset from plugin defaults.
    pub fn apply_defaults(&mut self, defaults: &PluginDefaults) {
        if self.ticker_interval == 0
            && let Some(interval) = defaults.ticker_interval
        {
            self.ticker_interval = interval;
        }
        if self.decoder.is_empty()
            && let Some(decoder) = &defaults.decoder
        {
            self.decoder = decoder.clone();
        }
        if self.synchronous_decode.is_none() {
            self.synchronous_decode = defaults.synchronous_decode;
        }
        if self.send_decode_failures.is_none() {
            self.send_decode_failures = defaults.send_decode_failures;
        }
    }
}

/// Settings shared by filter and output sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommonFoConfig {
    /// Seconds between ticks; 0 disables the ticker.
    #[serde(default)]
    pub ticker_interval: u64,
    /// Selects the messages this plugin receives.
    #[serde(default)]
    pub message_matcher: String,
    /// Accepted for compatibility; signing is not checked.
    #[serde(default)]
    pub message_signer: String,
    /// Whether a plugin failure may leave the pipeline running.
    #[serde(default)]
    pub can_exit: Option<bool>,
    /// Restart policy for a failing plugin.
    #[serde(default)]
    pub retries: RetryOptions,
    /// Encoder section used by outputs.
    #[serde(default)]
    pub encoder: String,
    /// Wrap encoded records in stream framing.
    #[serde(default)]
    pub use_framing: Option<bool>,
}

impl CommonFoConfig {
    /// Fill fields the user left unset from plugin defaults.
    ///
    /// `encoder` and `use_framing` only take defaults for outputs.
    pub fn apply_defaults(&mut self, defaults: &PluginDefaults, category: PluginCategory) {
        if self.ticker_interval == 0
            && let Some(interval) = defaults.ticker_interval
        {
            self.ticker_interval = interval;
        }
        if self.message_matcher.is_empty()
            && let Some(matcher) = &defaults.message_matcher
        {
            self.message_matcher = matcher.clone();
        }
        if self.can_exit.is_none() {
            self.can_exit = defaults.can_exit;
        }
        if category != PluginCategory::Output {
            return;
        }
        if self.encoder.is_empty()
            && let Some(encoder) = &defaults.encoder
        {
            self.encoder = encoder.clone();
        }
        if self.use_framing.is_none() {
            self.use_framing = defaults.use_framing;
        }
    }
}

/// Process-wide settings from the `[sluiced]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Envelopes in each pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Capacity of runner input channels.
    #[serde(default = "default_plugin_chan_size")]
    pub plugin_chan_size: usize,

    /// How many times a message may pass through the router.
    #[serde(default = "default_max_msg_loops")]
    pub max_msg_loops: u32,

    /// Hostname stamped on every message.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            plugin_chan_size: default_plugin_chan_size(),
            max_msg_loops: default_max_msg_loops(),
            hostname: default_hostname(),
            log_level: default_log_level(),
        }
    }
}

fn default_pool_size() -> usize {
    100
}

fn default_plugin_chan_size() -> usize {
    30
}

fn default_max_msg_loops() -> u32 {
    4
}

fn default_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message record carried through the pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity assigned to messages that don't set one (syslog "debug").
pub const DEFAULT_SEVERITY: i32 = 7;

fn default_severity() -> i32 {
    DEFAULT_SEVERITY
}

/// A single pipeline message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id; nil until assigned.
    #[serde(default = "Uuid::nil")]
    pub uuid: Uuid,
    /// Unix timestamp in nanoseconds.
    #[serde(default)]
    pub timestamp: i64,
    /// Message type.
    #[serde(rename = "type", default)]
    pub msg_type: String,
    /// Name of the producing plugin.
    #[serde(default)]
    pub logger: String,
    /// Syslog-style severity.
    #[serde(default = "default_severity")]
    pub severity: i32,
    /// Message body.
    #[serde(default)]
    pub payload: String,
    /// Host that produced the message.
    #[serde(default)]
    pub hostname: String,
    /// Process that produced the message.
    #[serde(default)]
    pub pid: u32,
    /// Free-form named fields.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            uuid: Uuid::nil(),
            timestamp: 0,
            msg_type: String::new(),
            logger: String::new(),
            severity: DEFAULT_SEVERITY,
            payload: String::new(),
            hostname: String::new(),
            pid: 0,
            fields: BTreeMap::new(),
        }
    }
}

impl Message {
    /// Clear every field, keeping string allocations for reuse.
    pub fn reset(&mut self) {
        self.uuid = Uuid::nil();
        self.timestamp = 0;
        self.msg_type.clear();
        self.logger.clear();
        self.severity = DEFAULT_SEVERITY;
        self.payload.clear();
        self.hostname.clear();
        self.pid = 0;
        self.fields.clear();
    }

    /// Value of the named field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Set or replace a field.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }
}

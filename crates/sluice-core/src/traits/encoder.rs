// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encoder plugin trait.

use crate::message::Message;
use crate::traits::{Plugin, PluginError};

/// Serializes a message for an output. Encoders never get a runner.
pub trait Encoder: Plugin {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, PluginError>;
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoder plugin trait.

use crate::envelope::Envelope;
use crate::traits::{Plugin, PluginError};

/// Turns the raw payload of an envelope into a structured message, in place.
pub trait Decoder: Plugin {
    fn decode(&mut self, envelope: &mut Envelope) -> Result<(), PluginError>;
}

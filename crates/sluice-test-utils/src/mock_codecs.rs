// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock decoders.

use sluice_core::{Decoder, Envelope, Plugin, PluginConfig, PluginError};

/// Leaves every message untouched.
#[derive(Debug, Default)]
pub struct PassthroughDecoder;

impl Plugin for PassthroughDecoder {
    fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Ok(())
    }
}

impl Decoder for PassthroughDecoder {
    fn decode(&mut self, _envelope: &mut Envelope) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Uppercases the payload; fails on an empty one.
#[derive(Debug, Default)]
pub struct UppercaseDecoder;

impl Plugin for UppercaseDecoder {
    fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Ok(())
    }
}

impl Decoder for UppercaseDecoder {
    fn decode(&mut self, envelope: &mut Envelope) -> Result<(), PluginError> {
        if envelope.payload.is_empty() {
            return Err("empty payload".into());
        }
        envelope.payload = envelope.payload.to_uppercase();
        Ok(())
    }
}

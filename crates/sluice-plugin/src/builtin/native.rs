// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON message codec.

use sluice_core::{Decoder, Encoder, Envelope, Message, Plugin, PluginConfig, PluginError};

/// Parses an envelope payload holding a JSON-encoded [`Message`].
///
/// The decoded message replaces the envelope's message. The envelope's uuid
/// and timestamp are kept when the payload doesn't carry its own.
#[derive(Debug, Default)]
pub struct NativeDecoder;

impl Plugin for NativeDecoder {
    fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Ok(())
    }
}

impl Decoder for NativeDecoder {
    fn decode(&mut self, envelope: &mut Envelope) -> Result<(), PluginError> {
        let mut decoded: Message = serde_json::from_str(&envelope.payload)?;
        if decoded.uuid.is_nil() {
            decoded.uuid = envelope.uuid;
        }
        if decoded.timestamp == 0 {
            decoded.timestamp = envelope.timestamp;
        }
        *envelope.message_mut() = decoded;
        Ok(())
    }
}

/// Serializes a [`Message`] as JSON.
#[derive(Debug, Default)]
pub struct NativeEncoder;

impl Plugin for NativeEncoder {
    fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Ok(())
    }
}

impl Encoder for NativeEncoder {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, PluginError> {
        Ok(serde_json::to_vec(message)?)
    }
}

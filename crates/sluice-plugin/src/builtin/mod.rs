// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in plugin types compiled into every Sluice binary.
//!
//! - `NativeDecoder` / `NativeEncoder`: the default JSON message codec
//! - `MultiDecoder`: a composite decoder cascading over named sub-decoders

mod multi;
mod native;

pub use multi::{CascadeStrategy, MultiDecoder, MultiDecoderConfig};
pub use native::{NativeDecoder, NativeEncoder};

use sluice_core::PluginHandle;

use crate::registry::PluginRegistry;

/// Type name of the default decoder.
pub const NATIVE_DECODER: &str = "NativeDecoder";
/// Type name of the default encoder.
pub const NATIVE_ENCODER: &str = "NativeEncoder";
/// Type name of the composite decoder.
pub const MULTI_DECODER: &str = "MultiDecoder";

/// Register every built-in plugin type.
pub fn register_builtins(registry: &mut PluginRegistry) {
    registry.register(NATIVE_DECODER, || {
        PluginHandle::Decoder(Box::new(NativeDecoder::default()))
    });
    registry.register(NATIVE_ENCODER, || {
        PluginHandle::Encoder(Box::new(NativeEncoder::default()))
    });
    registry.register(MULTI_DECODER, || {
        PluginHandle::Decoder(Box::new(MultiDecoder::default()))
    });
}

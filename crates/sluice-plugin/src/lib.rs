// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin type registry and built-in plugins.
//!
//! Plugin types are registered by name with a factory that produces a fresh,
//! uninitialized instance. The registry is populated once at startup and
//! handed to the pipeline, which only reads from it afterwards.

pub mod builtin;
pub mod registry;

pub use builtin::{
    MULTI_DECODER, MultiDecoder, NATIVE_DECODER, NATIVE_ENCODER, NativeDecoder, NativeEncoder,
    register_builtins,
};
pub use registry::{PluginFactory, PluginRegistry};

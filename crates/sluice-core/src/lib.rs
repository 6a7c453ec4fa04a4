// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sluice pipeline.
//!
//! This crate provides the foundational trait definitions, error types, and
//! message types shared by the configuration, plugin, and pipeline crates.
//! Every plugin category (input, decoder, filter, encoder, output) implements
//! a trait defined here, and every runner exposes its plugin-facing surface
//! through the runner traits.

pub mod envelope;
pub mod error;
pub mod message;
pub mod schema;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use envelope::Envelope;
pub use error::SluiceError;
pub use message::Message;
pub use schema::{ConfigDefaults, ConfigSchema, PluginConfig, PluginDefaults, SchemaError, TypedSchema};
pub use types::{EnvelopeSource, PluginCategory};

pub use traits::{
    Decoder, DecoderRunner, Encoder, Filter, FilterRunner, Input, InputRunner, Output,
    OutputRunner, Plugin, PluginError, PluginHandle, PluginHelper, WantsHelper, WantsName,
};

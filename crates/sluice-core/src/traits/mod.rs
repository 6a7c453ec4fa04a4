// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin and runner trait definitions.

pub mod decoder;
pub mod encoder;
pub mod filter;
pub mod helper;
pub mod input;
pub mod output;
pub mod plugin;
pub mod runner;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use filter::Filter;
pub use helper::PluginHelper;
pub use input::Input;
pub use output::Output;
pub use plugin::{Plugin, PluginError, PluginHandle, WantsHelper, WantsName};
pub use runner::{DecoderRunner, FilterRunner, InputRunner, OutputRunner};

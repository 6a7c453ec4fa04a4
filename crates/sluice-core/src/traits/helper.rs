// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pipeline surface exposed to plugins.

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::traits::{Decoder, DecoderRunner, Encoder, FilterRunner, OutputRunner};

/// Lookups and envelope access for plugins that ask for the helper.
#[async_trait]
pub trait PluginHelper: Send + Sync {
    /// A running output by name.
    fn output(&self, name: &str) -> Option<Arc<dyn OutputRunner>>;

    /// A running filter by name.
    fn filter(&self, name: &str) -> Option<Arc<dyn FilterRunner>>;

    /// A fresh, initialized decoder instance.
    fn decoder(&self, name: &str) -> Option<Box<dyn Decoder>>;

    /// A fresh encoder built from `base_name`, registered as `full_name`.
    fn encoder(&self, base_name: &str, full_name: &str) -> Option<Arc<dyn Encoder>>;

    /// A started decoder runner built from `base_name`, named `full_name`.
    fn decoder_runner(&self, base_name: &str, full_name: &str) -> Option<Arc<dyn DecoderRunner>>;

    /// Close and forget a decoder runner. `false` if it wasn't registered.
    fn stop_decoder_runner(&self, runner: &Arc<dyn DecoderRunner>) -> bool;

    fn hostname(&self) -> &str;

    /// An envelope from the inject pool, or `None` when the loop count
    /// would exceed the maximum.
    async fn pipeline_pack(&self, msg_loop_count: u32) -> Option<Envelope>;
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input plugin trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::traits::{InputRunner, Plugin, PluginError};

/// Produces envelopes and hands them to its runner for decoding and routing.
#[async_trait]
pub trait Input: Plugin {
    /// Run until stopped or until the source is exhausted.
    async fn run(&self, runner: Arc<dyn InputRunner>) -> Result<(), PluginError>;

    /// Ask a running input to return from `run`.
    fn stop(&self);
}

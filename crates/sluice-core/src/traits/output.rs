// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output plugin trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::traits::{OutputRunner, Plugin, PluginError};

/// Consumes matched envelopes and delivers them outside the pipeline.
#[async_trait]
pub trait Output: Plugin {
    async fn process_message(
        &self,
        runner: &dyn OutputRunner,
        envelope: Arc<Envelope>,
    ) -> Result<(), PluginError>;

    async fn timer_event(&self, _runner: &dyn OutputRunner) -> Result<(), PluginError> {
        Ok(())
    }
}

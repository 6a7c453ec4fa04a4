// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter plugin trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::traits::{FilterRunner, Plugin, PluginError};

/// Consumes matched envelopes and may inject new ones into the router.
#[async_trait]
pub trait Filter: Plugin {
    async fn process_message(
        &self,
        runner: &dyn FilterRunner,
        envelope: Arc<Envelope>,
    ) -> Result<(), PluginError>;

    /// Called every `ticker_interval` seconds when one is configured.
    async fn timer_event(&self, _runner: &dyn FilterRunner) -> Result<(), PluginError> {
        Ok(())
    }
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock input emitting a fixed burst of messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use sluice_core::{
    ConfigDefaults, ConfigSchema, Input, InputRunner, Plugin, PluginConfig, PluginError,
    TypedSchema,
};

/// Settings for [`CountingInput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountingInputConfig {
    /// Messages emitted per run.
    pub count: usize,
    /// `Type` stamped on each message.
    pub message_type: String,
}

impl Default for CountingInputConfig {
    fn default() -> Self {
        Self {
            count: 3,
            message_type: "count".to_string(),
        }
    }
}

impl ConfigDefaults for CountingInputConfig {}

/// Emits `count` messages with payloads `"{message_type}-0"`,
/// `"{message_type}-1"`, ... then waits until stopped.
#[derive(Default)]
pub struct CountingInput {
    config: CountingInputConfig,
    stopped: AtomicBool,
    wake: Arc<Notify>,
}

impl CountingInput {
    /// An input with default settings; `init` replaces them.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings decoded at `init`.
    pub fn config(&self) -> &CountingInputConfig {
        &self.config
    }
}

impl Plugin for CountingInput {
    fn init(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        if let Some(config) = config.typed::<CountingInputConfig>() {
            self.config = config.clone();
        }
        Ok(())
    }

    fn config_schema(&self) -> Option<Box<dyn ConfigSchema>> {
        Some(Box::new(TypedSchema::new(CountingInputConfig::default())))
    }
}

#[async_trait]
impl Input for CountingInput {
    async fn run(&self, runner: Arc<dyn InputRunner>) -> Result<(), PluginError> {
        for i in 0..self.config.count {
            if self.stopped.load(Ordering::SeqCst) {
                return Ok(());
            }
            let Some(mut envelope) = runner.new_envelope().await else {
                return Ok(());
            };
            envelope.msg_type = self.config.message_type.clone();
            envelope.payload = format!("{}-{i}", self.config.message_type);
            runner.deliver(envelope).await;
        }
        if !self.stopped.load(Ordering::SeqCst) {
            self.wake.notified().await;
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }
}

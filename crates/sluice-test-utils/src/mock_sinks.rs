// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock filters and outputs that capture what they receive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use sluice_core::{
    ConfigDefaults, ConfigSchema, Envelope, Filter, FilterRunner, Message, Output, OutputRunner,
    Plugin, PluginConfig, PluginDefaults, PluginError, TypedSchema,
};

/// Shared capture buffer for recording plugins.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    messages: Arc<Mutex<Vec<Message>>>,
    notify: Arc<Notify>,
}

impl Recorder {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `message` and wake waiters.
    pub async fn record(&self, message: Message) {
        self.messages.lock().await.push(message);
        self.notify.notify_waiters();
    }

    /// Get all recorded messages.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Messages recorded so far.
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// True before anything is recorded.
    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }

    /// Wait until at least `count` messages are recorded, or `timeout`
    /// elapses. Returns whether the count was reached.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.len().await >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

/// Records every matched message.
#[derive(Debug, Default)]
pub struct RecordingFilter {
    recorder: Recorder,
}

impl RecordingFilter {
    /// Records into `recorder`.
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl Plugin for RecordingFilter {
    fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Ok(())
    }
}

#[async_trait]
impl Filter for RecordingFilter {
    async fn process_message(
        &self,
        _runner: &dyn FilterRunner,
        envelope: Arc<Envelope>,
    ) -> Result<(), PluginError> {
        self.recorder.record(envelope.message().clone()).await;
        Ok(())
    }
}

/// Records every matched message; also checks it encodes when an encoder
/// is configured.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    recorder: Recorder,
}

impl RecordingOutput {
    /// Records into `recorder`.
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl Plugin for RecordingOutput {
    fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Ok(())
    }
}

#[async_trait]
impl Output for RecordingOutput {
    async fn process_message(
        &self,
        runner: &dyn OutputRunner,
        envelope: Arc<Envelope>,
    ) -> Result<(), PluginError> {
        let mut message = envelope.message().clone();
        if let Ok(bytes) = runner.encode(&message) {
            message.set_field("encoded_len", bytes.len().to_string());
        }
        self.recorder.record(message).await;
        Ok(())
    }
}

/// Settings for [`StrictFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrictFilterConfig {
    /// Must be positive; `init` rejects 0.
    pub threshold: u32,
    /// Free-form label.
    pub label: String,
}

impl Default for StrictFilterConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            label: "strict".to_string(),
        }
    }
}

impl ConfigDefaults for StrictFilterConfig {
    fn defaults(&self) -> PluginDefaults {
        PluginDefaults {
            ticker_interval: Some(5),
            message_matcher: Some("Type == 'metric'".to_string()),
            can_exit: Some(true),
            ..PluginDefaults::default()
        }
    }
}

/// A filter with a strict schema and its own framework defaults.
#[derive(Debug, Default)]
pub struct StrictFilter {
    config: StrictFilterConfig,
}

impl StrictFilter {
    /// Settings decoded at `init`.
    pub fn config(&self) -> &StrictFilterConfig {
        &self.config
    }
}

impl Plugin for StrictFilter {
    fn init(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        let config = config
            .typed::<StrictFilterConfig>()
            .ok_or("expected a typed config")?;
        if config.threshold == 0 {
            return Err("threshold must be positive".into());
        }
        self.config = config.clone();
        Ok(())
    }

    fn config_schema(&self) -> Option<Box<dyn ConfigSchema>> {
        Some(Box::new(TypedSchema::new(StrictFilterConfig::default())))
    }
}

#[async_trait]
impl Filter for StrictFilter {
    async fn process_message(
        &self,
        _runner: &dyn FilterRunner,
        _envelope: Arc<Envelope>,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// An output whose initialization always fails.
#[derive(Debug, Default)]
pub struct FailingOutput;

impl Plugin for FailingOutput {
    fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Err("refusing to start".into())
    }
}

#[async_trait]
impl Output for FailingOutput {
    async fn process_message(
        &self,
        _runner: &dyn OutputRunner,
        _envelope: Arc<Envelope>,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

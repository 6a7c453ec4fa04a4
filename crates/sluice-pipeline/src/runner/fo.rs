// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter/output runner.
//!
//! Filters and outputs share one runner shape: a matcher attached to the
//! router, a bounded channel of matched envelopes, and an optional ticker.
//! Outputs additionally carry the encoder named in their section.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use sluice_config::CommonFoConfig;
use sluice_core::{
    Encoder, Envelope, EnvelopeSource, Filter, FilterRunner, Message, Output, OutputRunner,
    PluginCategory, PluginError, PluginHelper, SluiceError,
};

use crate::context::RunnerContext;
use crate::matcher::MessageMatcher;
use crate::router::MatchRunner;
use crate::runner::retry::Backoff;

/// The plugin driven by a [`FoRunner`].
pub enum FoPlugin {
    Filter(Arc<dyn Filter>),
    Output(Arc<dyn Output>),
}

enum Event {
    Message(Arc<Envelope>),
    Tick,
    Closed,
}

/// Runs one filter or output plugin.
pub struct FoRunner {
    name: String,
    plugin: FoPlugin,
    config: CommonFoConfig,
    match_runner: Arc<MatchRunner>,
    receiver: Mutex<Option<mpsc::Receiver<Arc<Envelope>>>>,
    encoder: OnceLock<Arc<dyn Encoder>>,
    ctx: RunnerContext,
}

impl FoRunner {
    /// An unstarted filter runner; fails on a bad matcher.
    pub fn new_filter(
        name: impl Into<String>,
        filter: Box<dyn Filter>,
        config: CommonFoConfig,
        ctx: RunnerContext,
    ) -> Result<Arc<Self>, SluiceError> {
        Self::build(name.into(), FoPlugin::Filter(Arc::from(filter)), config, ctx)
    }

    /// An unstarted output runner; fails on a bad matcher.
    pub fn new_output(
        name: impl Into<String>,
        output: Box<dyn Output>,
        config: CommonFoConfig,
        ctx: RunnerContext,
    ) -> Result<Arc<Self>, SluiceError> {
        Self::build(name.into(), FoPlugin::Output(Arc::from(output)), config, ctx)
    }

    fn build(
        name: String,
        plugin: FoPlugin,
        config: CommonFoConfig,
        ctx: RunnerContext,
    ) -> Result<Arc<Self>, SluiceError> {
        let matcher = MessageMatcher::parse(&config.message_matcher)?;
        let (match_runner, receiver) = MatchRunner::new(name.clone(), matcher, ctx.chan_size);
        Ok(Arc::new(Self {
            name,
            plugin,
            config,
            match_runner,
            receiver: Mutex::new(Some(receiver)),
            encoder: OnceLock::new(),
            ctx,
        }))
    }

    /// Runner name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filter or output.
    pub fn category(&self) -> PluginCategory {
        match self.plugin {
            FoPlugin::Filter(_) => PluginCategory::Filter,
            FoPlugin::Output(_) => PluginCategory::Output,
        }
    }

    /// The wrapped plugin.
    pub fn plugin(&self) -> &FoPlugin {
        &self.plugin
    }

    /// Resolved filter or output settings.
    pub fn config(&self) -> &CommonFoConfig {
        &self.config
    }

    /// The router registration for this runner.
    pub fn match_runner(&self) -> &Arc<MatchRunner> {
        &self.match_runner
    }

    /// Resolve the output encoder and spawn the processing task.
    pub fn start(
        self: &Arc<Self>,
        helper: &dyn PluginHelper,
        tracker: &TaskTracker,
    ) -> Result<(), SluiceError> {
        let encoder = &self.config.encoder;
        if matches!(self.plugin, FoPlugin::Output(_))
            && !encoder.is_empty()
            && self.encoder.get().is_none()
        {
            let full_name = format!("{}-{encoder}", self.name);
            let instance = helper.encoder(encoder, &full_name).ok_or_else(|| {
                SluiceError::RunnerStartFailed {
                    runner: self.name.clone(),
                    reason: format!("encoder '{encoder}' not available"),
                }
            })?;
            let _ = self.encoder.set(instance);
        }

        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| SluiceError::RunnerStartFailed {
                runner: self.name.clone(),
                reason: "already started".to_string(),
            })?;

        let runner = Arc::clone(self);
        tracker.spawn(async move { runner.run(receiver).await });
        Ok(())
    }

    async fn run(self: Arc<Self>, mut receiver: mpsc::Receiver<Arc<Envelope>>) {
        info!(runner = %self.name, category = %self.category(), "runner started");
        let mut backoff = Backoff::new(&self.config.retries);
        let mut ticker = (self.config.ticker_interval > 0).then(|| {
            let period = Duration::from_secs(self.config.ticker_interval);
            tokio::time::interval_at(Instant::now() + period, period)
        });

        let mut failed = false;
        loop {
            let event = tokio::select! {
                envelope = receiver.recv() => envelope.map_or(Event::Closed, Event::Message),
                _ = tick(&mut ticker) => Event::Tick,
            };
            let outcome = match event {
                Event::Message(envelope) => self.process_message(envelope).await,
                Event::Tick => self.timer_event().await,
                Event::Closed => break,
            };
            let Err(err) = outcome else {
                backoff.reset();
                continue;
            };

            match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        runner = %self.name,
                        error = %err,
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "plugin failed, restarting"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!(runner = %self.name, error = %err, "plugin failed and is out of retries");
                    failed = true;
                    break;
                }
            }
        }

        if failed {
            self.match_runner.close();
            if !self.config.can_exit.unwrap_or(false) {
                error!(runner = %self.name, "runner can't exit, shutting down pipeline");
                self.ctx.shutdown.cancel();
            }
        }
        debug!(runner = %self.name, "runner exited");
    }

    async fn process_message(&self, envelope: Arc<Envelope>) -> Result<(), PluginError> {
        match &self.plugin {
            FoPlugin::Filter(filter) => filter.process_message(self, envelope).await,
            FoPlugin::Output(output) => output.process_message(self, envelope).await,
        }
    }

    async fn timer_event(&self) -> Result<(), PluginError> {
        match &self.plugin {
            FoPlugin::Filter(filter) => filter.timer_event(self).await,
            FoPlugin::Output(output) => output.timer_event(self).await,
        }
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[async_trait]
impl FilterRunner for FoRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn matcher(&self) -> &str {
        self.match_runner.matcher().expression()
    }

    async fn new_envelope(&self, msg_loop_count: u32) -> Option<Envelope> {
        self.ctx
            .acquire(EnvelopeSource::Reinjected, msg_loop_count)
            .await
    }

    async fn inject(&self, envelope: Envelope) -> bool {
        if self.match_runner.matcher().matches(&envelope) {
            warn!(filter = %self.name, "refusing to inject a message matching the filter's own matcher");
            return false;
        }
        self.ctx.router.route(envelope).await;
        true
    }
}

impl OutputRunner for FoRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn matcher(&self) -> &str {
        self.match_runner.matcher().expression()
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>, PluginError> {
        let encoder = self
            .encoder
            .get()
            .ok_or_else(|| format!("no encoder configured for '{}'", self.name))?;
        let mut encoded = encoder.encode(message)?;
        if !self.config.use_framing.unwrap_or(false) {
            return Ok(encoded);
        }

        let len = u32::try_from(encoded.len()).map_err(|_| "encoded message too large to frame")?;
        let mut framed = Vec::with_capacity(encoded.len() + 4);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.append(&mut encoded);
        Ok(framed)
    }
}

impl std::fmt::Debug for FoRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoRunner")
            .field("name", &self.name)
            .field("category", &self.category())
            .field("matcher", &self.match_runner.matcher())
            .finish()
    }
}

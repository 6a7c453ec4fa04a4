// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input runner: drives an input plugin and delivers what it reads.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use sluice_config::CommonInputConfig;
use sluice_core::{
    Decoder, DecoderRunner, Envelope, EnvelopeSource, Input, InputRunner, PluginError,
    PluginHelper, SluiceError,
};

use crate::context::RunnerContext;
use crate::runner::decoder::DECODE_ERROR_FIELD;
use crate::runner::retry::Backoff;

/// How delivered envelopes are decoded.
enum Decoding {
    None,
    Sync(Mutex<Box<dyn Decoder>>),
    Async(Arc<dyn DecoderRunner>),
}

/// Runs one input plugin, restarting it when `run` fails.
pub struct InRunner {
    name: String,
    input: Arc<dyn Input>,
    config: CommonInputConfig,
    ctx: RunnerContext,
    decoding: OnceLock<Decoding>,
    stopped: CancellationToken,
}

impl InRunner {
    /// An unstarted runner for `input`.
    pub fn new(
        name: impl Into<String>,
        input: Box<dyn Input>,
        config: CommonInputConfig,
        ctx: RunnerContext,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            input: Arc::from(input),
            config,
            ctx,
            decoding: OnceLock::new(),
            stopped: CancellationToken::new(),
        })
    }

    /// Runner name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped input plugin.
    pub fn input(&self) -> &Arc<dyn Input> {
        &self.input
    }

    /// Resolved input settings.
    pub fn config(&self) -> &CommonInputConfig {
        &self.config
    }

    /// The decoder runner feeding this input's messages, if decoding is
    /// asynchronous.
    pub fn decoder_runner(&self) -> Option<Arc<dyn DecoderRunner>> {
        match self.decoding.get() {
            Some(Decoding::Async(runner)) => Some(Arc::clone(runner)),
            _ => None,
        }
    }

    /// True once `stop` was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Resolve the configured decoder and spawn the input task.
    pub fn start(
        self: &Arc<Self>,
        helper: &dyn PluginHelper,
        tracker: &TaskTracker,
    ) -> Result<(), SluiceError> {
        if self.decoding.get().is_some() {
            return Err(self.start_failed("already started".to_string()));
        }

        let decoder = &self.config.decoder;
        let decoding = if decoder.is_empty() {
            Decoding::None
        } else if self.config.synchronous_decode.unwrap_or(false) {
            let instance = helper
                .decoder(decoder)
                .ok_or_else(|| self.start_failed(format!("decoder '{decoder}' not available")))?;
            Decoding::Sync(Mutex::new(instance))
        } else {
            let full_name = format!("{}-{decoder}", self.name);
            let runner = helper
                .decoder_runner(decoder, &full_name)
                .ok_or_else(|| self.start_failed(format!("decoder '{decoder}' not available")))?;
            runner.set_send_failures(self.send_decode_failures());
            Decoding::Async(runner)
        };
        if self.decoding.set(decoding).is_err() {
            return Err(self.start_failed("already started".to_string()));
        }

        let runner = Arc::clone(self);
        tracker.spawn(async move { runner.run().await });
        Ok(())
    }

    /// Ask the input to return and keep it from restarting.
    pub fn stop(&self) {
        self.stopped.cancel();
        self.input.stop();
    }

    async fn run(self: Arc<Self>) {
        info!(input = %self.name, "input started");
        let mut backoff = Backoff::new(&self.config.retries);
        loop {
            let handle: Arc<dyn InputRunner> = self.clone();
            let result = self.input.run(handle).await;
            if self.stopped.is_cancelled() || self.ctx.shutdown.is_cancelled() {
                break;
            }
            let err = match result {
                Ok(()) => {
                    info!(input = %self.name, "input exited");
                    break;
                }
                Err(err) => err,
            };

            let Some(delay) = backoff.next_delay() else {
                error!(input = %self.name, error = %err, "input failed and is out of retries, shutting down");
                self.ctx.shutdown.cancel();
                break;
            };
            warn!(
                input = %self.name,
                error = %err,
                attempt = backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "input failed, restarting"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.stopped.cancelled() => break,
            }
        }
        debug!(input = %self.name, "input runner exited");
    }

    fn send_decode_failures(&self) -> bool {
        self.config.send_decode_failures.unwrap_or(false)
    }

    async fn decode_failed(&self, mut envelope: Envelope, err: PluginError) {
        if self.send_decode_failures() {
            envelope.set_field(DECODE_ERROR_FIELD, err.to_string());
            self.ctx.router.route(envelope).await;
        } else {
            warn!(input = %self.name, error = %err, "decode failed, dropping message");
        }
    }

    fn start_failed(&self, reason: String) -> SluiceError {
        SluiceError::RunnerStartFailed {
            runner: self.name.clone(),
            reason,
        }
    }
}

#[async_trait]
impl InputRunner for InRunner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn new_envelope(&self) -> Option<Envelope> {
        if self.stopped.is_cancelled() {
            return None;
        }
        self.ctx.acquire(EnvelopeSource::External, 0).await
    }

    async fn deliver(&self, mut envelope: Envelope) {
        match self.decoding.get() {
            Some(Decoding::Sync(decoder)) => {
                let result = decoder
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .decode(&mut envelope);
                match result {
                    Ok(()) => {
                        self.ctx.router.route(envelope).await;
                    }
                    Err(err) => self.decode_failed(envelope, err).await,
                }
            }
            Some(Decoding::Async(runner)) => {
                if !runner.send(envelope).await {
                    debug!(input = %self.name, "decoder runner closed, dropping message");
                }
            }
            Some(Decoding::None) | None => {
                self.ctx.router.route(envelope).await;
            }
        }
    }

    fn ticker_interval(&self) -> Option<Duration> {
        (self.config.ticker_interval > 0).then(|| Duration::from_secs(self.config.ticker_interval))
    }
}

impl std::fmt::Debug for InRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InRunner")
            .field("name", &self.name)
            .field("decoder", &self.config.decoder)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

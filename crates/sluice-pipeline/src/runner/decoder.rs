// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoder runner: a task decoding envelopes from a bounded queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use sluice_core::{Decoder, DecoderRunner, Envelope, SluiceError};

use crate::router::MessageRouter;

/// Field set on messages routed despite a decode failure.
pub const DECODE_ERROR_FIELD: &str = "decode_error";

/// Runs one decoder instance on its own task.
pub struct DecRunner {
    name: String,
    sender: Mutex<Option<mpsc::Sender<Envelope>>>,
    pending: Mutex<Option<(Box<dyn Decoder>, mpsc::Receiver<Envelope>)>>,
    send_failures: AtomicBool,
}

impl DecRunner {
    /// A runner for `decoder` with a queue of `chan_size` envelopes. Call
    /// [`start`](Self::start) to begin decoding.
    pub fn new(name: impl Into<String>, decoder: Box<dyn Decoder>, chan_size: usize) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(chan_size.max(1));
        Arc::new(Self {
            name: name.into(),
            sender: Mutex::new(Some(sender)),
            pending: Mutex::new(Some((decoder, receiver))),
            send_failures: AtomicBool::new(false),
        })
    }

    /// Spawn the decode loop. The task exits once the runner is closed and
    /// its queue is drained.
    pub fn start(
        self: &Arc<Self>,
        router: Arc<MessageRouter>,
        tracker: &TaskTracker,
    ) -> Result<(), SluiceError> {
        let (mut decoder, mut receiver) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| SluiceError::RunnerStartFailed {
                runner: self.name.clone(),
                reason: "already started".to_string(),
            })?;

        let runner = Arc::clone(self);
        tracker.spawn(async move {
            debug!(decoder = %runner.name, "decoder runner started");
            while let Some(mut envelope) = receiver.recv().await {
                match decoder.decode(&mut envelope) {
                    Ok(()) => {
                        router.route(envelope).await;
                    }
                    Err(err) if runner.send_failures.load(Ordering::Relaxed) => {
                        envelope.set_field(DECODE_ERROR_FIELD, err.to_string());
                        router.route(envelope).await;
                    }
                    Err(err) => {
                        warn!(decoder = %runner.name, error = %err, "decode failed, dropping message");
                    }
                }
            }
            debug!(decoder = %runner.name, "decoder runner exited");
        });
        Ok(())
    }

    /// True once [`close`](DecoderRunner::close) was called.
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[async_trait]
impl DecoderRunner for DecRunner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, envelope: Envelope) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sender {
            Some(sender) => sender.send(envelope).await.is_ok(),
            None => false,
        }
    }

    fn set_send_failures(&self, send: bool) {
        self.send_failures.store(send, Ordering::Relaxed);
    }

    fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl std::fmt::Debug for DecRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecRunner")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

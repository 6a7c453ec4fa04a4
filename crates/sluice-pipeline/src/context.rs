// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state handed to every runner.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sluice_config::GlobalConfig;
use sluice_core::{Envelope, EnvelopeSource};

use crate::pool::EnvelopePool;
use crate::router::MessageRouter;

/// Router, pools, and process identity shared by runners.
#[derive(Debug, Clone)]
pub struct RunnerContext {
    /// Routes messages to filters and outputs.
    pub router: Arc<MessageRouter>,
    /// Envelopes for inputs.
    pub input_pool: Arc<EnvelopePool>,
    /// Envelopes for filter injection.
    pub inject_pool: Arc<EnvelopePool>,
    /// Cancelled once the pipeline begins shutting down.
    pub shutdown: CancellationToken,
    /// Stamped on produced messages.
    pub hostname: Arc<str>,
    /// Stamped on produced messages.
    pub pid: u32,
    /// Routing passes allowed per message.
    pub max_msg_loops: u32,
    /// Capacity of runner channels.
    pub chan_size: usize,
}

impl RunnerContext {
    /// Fresh router and pools sized from `globals`.
    pub fn new(globals: &GlobalConfig) -> Self {
        Self {
            router: Arc::new(MessageRouter::new()),
            input_pool: Arc::new(EnvelopePool::new("input", globals.pool_size)),
            inject_pool: Arc::new(EnvelopePool::new("inject", globals.pool_size)),
            shutdown: CancellationToken::new(),
            hostname: Arc::from(globals.hostname.as_str()),
            pid: std::process::id(),
            max_msg_loops: globals.max_msg_loops,
            chan_size: globals.plugin_chan_size,
        }
    }

    /// Wait for an envelope from the pool for `source`.
    ///
    /// Returns `None` when `msg_loop_count + 1` exceeds the loop limit, or
    /// once shutdown has begun. Otherwise the envelope carries a new uuid,
    /// the current time, this host and pid, and the incremented loop count.
    pub async fn acquire(&self, source: EnvelopeSource, msg_loop_count: u32) -> Option<Envelope> {
        let loop_count = msg_loop_count.checked_add(1)?;
        if loop_count > self.max_msg_loops {
            return None;
        }

        let pool = match source {
            EnvelopeSource::External => &self.input_pool,
            EnvelopeSource::Reinjected => &self.inject_pool,
        };
        let mut envelope = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return None,
            envelope = pool.acquire() => envelope?,
        };

        envelope.uuid = Uuid::new_v4();
        envelope.timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        envelope.hostname.clear();
        envelope.hostname.push_str(&self.hostname);
        envelope.pid = self.pid;
        envelope.set_msg_loop_count(loop_count);
        Some(envelope)
    }
}

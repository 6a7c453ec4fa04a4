// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The runner surfaces plugins see while they run.

use std::time::Duration;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::message::Message;
use crate::traits::PluginError;

/// Handed to [`Input::run`](crate::Input::run).
#[async_trait]
pub trait InputRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Wait for a free envelope from the input pool. `None` once the
    /// pipeline is shutting down.
    async fn new_envelope(&self) -> Option<Envelope>;

    /// Decode (if a decoder is configured) and route an envelope.
    async fn deliver(&self, envelope: Envelope);

    fn ticker_interval(&self) -> Option<Duration>;
}

/// A running decoder fed through a bounded channel.
#[async_trait]
pub trait DecoderRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Queue an envelope for decoding. Returns `false` once closed.
    async fn send(&self, envelope: Envelope) -> bool;

    /// Route envelopes that fail to decode, tagged with the error, instead
    /// of dropping them.
    fn set_send_failures(&self, send: bool);

    /// Stop accepting envelopes. Queued ones are still decoded.
    fn close(&self);
}

/// Handed to [`Filter`](crate::Filter) callbacks.
#[async_trait]
pub trait FilterRunner: Send + Sync {
    fn name(&self) -> &str;

    fn matcher(&self) -> &str;

    /// Wait for an envelope from the inject pool. `None` when the loop
    /// count would exceed the configured maximum.
    async fn new_envelope(&self, msg_loop_count: u32) -> Option<Envelope>;

    /// Route an envelope back through the router. Returns `false` if the
    /// envelope was dropped.
    async fn inject(&self, envelope: Envelope) -> bool;
}

/// Handed to [`Output`](crate::Output) callbacks.
pub trait OutputRunner: Send + Sync {
    fn name(&self) -> &str;

    fn matcher(&self) -> &str;

    /// Encode with the configured encoder, applying framing if enabled.
    fn encode(&self, message: &Message) -> Result<Vec<u8>, PluginError>;
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pooled message envelopes.
//!
//! An [`Envelope`] wraps a [`Message`] together with its loop count. Envelopes
//! drawn from a pool carry a sender back to that pool; when the last holder
//! drops one, the message is reset and the envelope returns to the pool. Fan
//! out to several consumers shares an `Arc<Envelope>`, so the envelope goes
//! back only after every consumer is done with it.

use std::fmt;
use std::ops::{Deref, DerefMut};

use tokio::sync::mpsc;

use crate::message::Message;

/// A message plus the bookkeeping the pipeline needs to route and recycle it.
pub struct Envelope {
    message: Message,
    msg_loop_count: u32,
    recycle: Option<mpsc::Sender<Envelope>>,
}

impl Envelope {
    /// A detached envelope that is simply freed on drop.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            msg_loop_count: 0,
            recycle: None,
        }
    }

    /// An empty envelope that returns to `recycle` when dropped.
    pub fn pooled(recycle: mpsc::Sender<Envelope>) -> Self {
        Self {
            message: Message::default(),
            msg_loop_count: 0,
            recycle: Some(recycle),
        }
    }

    /// The carried message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Mutable access to the carried message.
    pub fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    /// How many times this message has passed through the router.
    pub fn msg_loop_count(&self) -> u32 {
        self.msg_loop_count
    }

    /// Record how many times the message has been routed.
    pub fn set_msg_loop_count(&mut self, count: u32) {
        self.msg_loop_count = count;
    }

    /// Whether dropping this envelope returns it to a pool.
    pub fn is_pooled(&self) -> bool {
        self.recycle.is_some()
    }
}

impl Deref for Envelope {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}

impl DerefMut for Envelope {
    fn deref_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl Drop for Envelope {
    fn drop(&mut self) {
        let Some(recycle) = self.recycle.take() else {
            return;
        };
        let mut message = std::mem::take(&mut self.message);
        message.reset();
        let fresh = Envelope {
            message,
            msg_loop_count: 0,
            recycle: Some(recycle.clone()),
        };
        if let Err(err) = recycle.try_send(fresh) {
            // Pool closed or full: detach so the rejected envelope is freed.
            let mut rejected = err.into_inner();
            rejected.recycle = None;
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("message", &self.message)
            .field("msg_loop_count", &self.msg_loop_count)
            .field("pooled", &self.is_pooled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn detached_envelope_is_not_pooled() {
        let env = Envelope::new(Message::default());
        assert!(!env.is_pooled());
        assert_eq!(env.msg_loop_count(), 0);
    }

    #[test]
    fn drop_returns_reset_envelope_to_pool() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut env = Envelope::pooled(tx);
        env.payload = "hello".into();
        env.set_msg_loop_count(3);
        drop(env);

        let recycled = rx.try_recv().expect("envelope should be recycled");
        assert!(recycled.is_pooled());
        assert!(recycled.payload.is_empty());
        assert_eq!(recycled.msg_loop_count(), 0);
    }

    #[test]
    fn shared_envelope_recycles_after_last_holder() {
        let (tx, mut rx) = mpsc::channel(1);
        let shared = Arc::new(Envelope::pooled(tx));
        let second = Arc::clone(&shared);

        drop(shared);
        assert!(rx.try_recv().is_err());

        drop(second);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn drop_into_closed_pool_does_not_recurse() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let env = Envelope::pooled(tx);
        drop(env);
    }
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded envelope pools.
//!
//! A pool is a bounded channel pre-filled with envelopes that point back at
//! it. Acquiring waits for a free envelope; dropping the last reference to
//! an envelope sends it back.

use tokio::sync::{Mutex, mpsc};

use sluice_core::Envelope;

/// A fixed-size pool of reusable envelopes.
pub struct EnvelopePool {
    name: &'static str,
    sender: mpsc::Sender<Envelope>,
    receiver: Mutex<mpsc::Receiver<Envelope>>,
}

impl EnvelopePool {
    /// Create a pool holding `size` envelopes (at least one).
    pub fn new(name: &'static str, size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel(size);
        for _ in 0..size {
            // Capacity equals the envelope count, so this never fails.
            let _ = sender.try_send(Envelope::pooled(sender.clone()));
        }
        Self {
            name,
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Pool name, for logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for a free envelope.
    pub async fn acquire(&self) -> Option<Envelope> {
        self.receiver.lock().await.recv().await
    }

    /// Total envelopes owned by the pool.
    pub fn size(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Envelopes currently sitting in the pool.
    pub fn available(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

impl std::fmt::Debug for EnvelopePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopePool")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn pool_starts_full() {
        let pool = EnvelopePool::new("input", 3);
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test]
    async fn zero_size_is_clamped() {
        let pool = EnvelopePool::new("input", 0);
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn dropped_envelope_returns_to_pool() {
        let pool = EnvelopePool::new("input", 1);
        let mut envelope = pool.acquire().await.unwrap();
        envelope.payload = "data".into();
        assert_eq!(pool.available(), 0);

        drop(envelope);
        assert_eq!(pool.available(), 1);
        let recycled = pool.acquire().await.unwrap();
        assert!(recycled.payload.is_empty());
    }

    #[tokio::test]
    async fn acquire_waits_for_release() {
        let pool = Arc::new(EnvelopePool::new("inject", 1));
        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.acquire().await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap());
    }
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff with jitter for restarting failed plugins.

use std::time::Duration;

use rand::Rng;
use sluice_config::RetryOptions;

/// Tracks restart attempts against a [`RetryOptions`] budget.
#[derive(Debug, Clone)]
pub struct Backoff {
    options: RetryOptions,
    attempts: i64,
    next: Duration,
}

impl Backoff {
    /// A fresh schedule starting at `options.delay`.
    pub fn new(options: &RetryOptions) -> Self {
        Self {
            options: options.clone(),
            attempts: 0,
            next: options.delay,
        }
    }

    /// The wait before the next attempt, or `None` once retries are used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.options.max_retries >= 0 && self.attempts >= self.options.max_retries {
            return None;
        }
        self.attempts += 1;

        let base = self.next.min(self.options.max_delay);
        self.next = self.next.saturating_mul(2).min(self.options.max_delay);
        Some(base + self.jitter())
    }

    /// Forget earlier failures after a successful run.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.next = self.options.delay;
    }

    /// Delays handed out since the last reset.
    pub fn attempts(&self) -> i64 {
        self.attempts
    }

    fn jitter(&self) -> Duration {
        let max = u64::try_from(self.options.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

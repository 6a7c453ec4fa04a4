// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message router fanning envelopes out to filters and outputs.
//!
//! Each filter and output registers a [`MatchRunner`]: its matcher plus the
//! sending half of its input channel. Routing shares one `Arc<Envelope>`
//! among every match, so the envelope returns to its pool once the last
//! consumer drops it.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use sluice_core::Envelope;

use crate::matcher::MessageMatcher;

/// A matcher attached to a runner's input channel.
pub struct MatchRunner {
    name: String,
    matcher: MessageMatcher,
    sender: Mutex<Option<mpsc::Sender<Arc<Envelope>>>>,
}

impl MatchRunner {
    /// Create a match runner and the receiving end its runner reads from.
    pub fn new(
        name: impl Into<String>,
        matcher: MessageMatcher,
        chan_size: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Arc<Envelope>>) {
        let (sender, receiver) = mpsc::channel(chan_size.max(1));
        let runner = Arc::new(Self {
            name: name.into(),
            matcher,
            sender: Mutex::new(Some(sender)),
        });
        (runner, receiver)
    }

    /// Name of the runner this matcher feeds.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed matcher.
    pub fn matcher(&self) -> &MessageMatcher {
        &self.matcher
    }

    fn sender(&self) -> Option<mpsc::Sender<Arc<Envelope>>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Close the input channel; the runner drains what is queued and exits.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// True once the channel was closed.
    pub fn is_closed(&self) -> bool {
        self.sender().is_none_or(|sender| sender.is_closed())
    }
}

impl std::fmt::Debug for MatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRunner")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .finish()
    }
}

/// Routes envelopes to every filter and output whose matcher accepts them.
#[derive(Debug, Default)]
pub struct MessageRouter {
    filters: RwLock<Vec<Arc<MatchRunner>>>,
    outputs: RwLock<Vec<Arc<MatchRunner>>>,
}

impl MessageRouter {
    /// A router with no matchers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a filter matcher.
    pub fn add_filter_matcher(&self, runner: Arc<MatchRunner>) {
        debug!(filter = %runner.name(), "adding filter matcher");
        write(&self.filters).push(runner);
    }

    /// Attach an output matcher.
    pub fn add_output_matcher(&self, runner: Arc<MatchRunner>) {
        debug!(output = %runner.name(), "adding output matcher");
        write(&self.outputs).push(runner);
    }

    /// Detach a filter matcher and close its channel.
    pub fn remove_filter_matcher(&self, name: &str) -> bool {
        remove_matcher(&self.filters, name)
    }

    /// Detach an output matcher and close its channel.
    pub fn remove_output_matcher(&self, name: &str) -> bool {
        remove_matcher(&self.outputs, name)
    }

    /// Attached filter matchers.
    pub fn filter_count(&self) -> usize {
        read(&self.filters).len()
    }

    /// Attached output matchers.
    pub fn output_count(&self) -> usize {
        read(&self.outputs).len()
    }

    /// Deliver `envelope` to every matching runner, returning how many
    /// accepted it. Waits when a runner's channel is full.
    pub async fn route(&self, envelope: Envelope) -> usize {
        let shared = Arc::new(envelope);
        let targets: Vec<mpsc::Sender<Arc<Envelope>>> = read(&self.filters)
            .iter()
            .chain(read(&self.outputs).iter())
            .filter(|runner| runner.matcher.matches(&shared))
            .filter_map(|runner| runner.sender())
            .collect();

        let mut delivered = 0;
        for target in targets {
            if target.send(Arc::clone(&shared)).await.is_ok() {
                delivered += 1;
            }
        }
        trace!(uuid = %shared.uuid, delivered, "routed message");
        delivered
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn remove_matcher(list: &RwLock<Vec<Arc<MatchRunner>>>, name: &str) -> bool {
    let mut runners = write(list);
    match runners.iter().position(|runner| runner.name() == name) {
        Some(index) => {
            let runner = runners.remove(index);
            runner.close();
            debug!(runner = %name, "removed matcher");
            true
        }
        None => false,
    }
}

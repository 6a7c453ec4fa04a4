// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin makers, runners, routing, and orchestration for Sluice.
//!
//! A [`Pipeline`] is loaded from a configuration document: every section
//! becomes a [`PluginMaker`], decoders and encoders are registered first,
//! and a runner is built for every input, filter, and output. Starting the
//! pipeline spawns the runners; messages flow from inputs through optional
//! decoders into the [`MessageRouter`], which fans them out to matching
//! filters and outputs.

pub mod context;
mod loader;
pub mod maker;
pub mod matcher;
pub mod pipeline;
pub mod pool;
pub mod resolver;
pub mod router;
pub mod runner;

pub use context::RunnerContext;
pub use maker::{CategoryConfig, PluginMaker, PreparedConfig};
pub use matcher::MessageMatcher;
pub use pipeline::Pipeline;
pub use pool::EnvelopePool;
pub use resolver::{DependencyNode, order_dependencies};
pub use router::{MatchRunner, MessageRouter};
pub use runner::{Backoff, DECODE_ERROR_FIELD, DecRunner, FoPlugin, FoRunner, InRunner, RunnerHandle};

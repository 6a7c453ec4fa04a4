// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sluice pipeline tests.
//!
//! Provides mock plugins of every category so pipelines can be loaded and
//! run without external sources or sinks.
//!
//! # Components
//!
//! - [`CountingInput`] - Emits a configured number of messages, then idles until stopped
//! - [`RecordingFilter`] / [`RecordingOutput`] - Capture every message they receive
//! - [`StrictFilter`] - Typed schema with plugin-declared framework defaults
//! - [`FailingOutput`] - Always rejects its configuration
//! - [`mock_registry`] - A registry with the built-ins plus every mock

pub mod mock_codecs;
pub mod mock_input;
pub mod mock_sinks;
pub mod registry;

pub use mock_codecs::{PassthroughDecoder, UppercaseDecoder};
pub use mock_input::{CountingInput, CountingInputConfig};
pub use mock_sinks::{FailingOutput, Recorder, RecordingFilter, RecordingOutput, StrictFilter, StrictFilterConfig};
pub use registry::mock_registry;

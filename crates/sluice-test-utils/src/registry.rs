// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sluice_core::PluginHandle;
use sluice_plugin::{PluginRegistry, register_builtins};

use crate::mock_codecs::{PassthroughDecoder, UppercaseDecoder};
use crate::mock_input::CountingInput;
use crate::mock_sinks::{FailingOutput, Recorder, RecordingFilter, RecordingOutput, StrictFilter};

/// A registry holding the built-ins plus every mock plugin. Recording
/// plugins share `recorder`.
pub fn mock_registry(recorder: &Recorder) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    register_builtins(&mut registry);

    registry.register("CountingInput", || {
        PluginHandle::Input(Box::new(CountingInput::new()))
    });
    registry.register("PassthroughDecoder", || {
        PluginHandle::Decoder(Box::new(PassthroughDecoder))
    });
    registry.register("UppercaseDecoder", || {
        PluginHandle::Decoder(Box::new(UppercaseDecoder))
    });
    registry.register("StrictFilter", || {
        PluginHandle::Filter(Box::new(StrictFilter::default()))
    });
    registry.register("FailingOutput", || {
        PluginHandle::Output(Box::new(FailingOutput))
    });

    let filter_recorder = recorder.clone();
    registry.register("RecordingFilter", move || {
        PluginHandle::Filter(Box::new(RecordingFilter::new(filter_recorder.clone())))
    });
    let output_recorder = recorder.clone();
    registry.register("RecordingOutput", move || {
        PluginHandle::Output(Box::new(RecordingOutput::new(output_recorder.clone())))
    });
    registry
}

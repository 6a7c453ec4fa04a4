// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runners drive plugin instances on their own tasks.
//!
//! Inputs run inside an [`InRunner`], decoders inside a [`DecRunner`], and
//! filters and outputs share the [`FoRunner`] shape. Every runner restarts
//! its plugin on error according to the section's retry options.

pub mod decoder;
pub mod fo;
pub mod input;
pub mod retry;

use std::sync::Arc;

pub use decoder::{DECODE_ERROR_FIELD, DecRunner};
pub use fo::{FoPlugin, FoRunner};
pub use input::InRunner;
pub use retry::Backoff;

use sluice_core::PluginCategory;

/// A constructed runner, tagged with its category.
#[derive(Debug, Clone)]
pub enum RunnerHandle {
    Input(Arc<InRunner>),
    Decoder(Arc<DecRunner>),
    Filter(Arc<FoRunner>),
    Output(Arc<FoRunner>),
}

impl RunnerHandle {
    /// Category of the wrapped runner.
    pub fn category(&self) -> PluginCategory {
        match self {
            Self::Input(_) => PluginCategory::Input,
            Self::Decoder(_) => PluginCategory::Decoder,
            Self::Filter(_) => PluginCategory::Filter,
            Self::Output(_) => PluginCategory::Output,
        }
    }

    /// Name of the wrapped runner.
    pub fn name(&self) -> &str {
        use sluice_core::DecoderRunner;

        match self {
            Self::Input(runner) => runner.name(),
            Self::Decoder(runner) => DecoderRunner::name(runner.as_ref()),
            Self::Filter(runner) | Self::Output(runner) => runner.name(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A helper that resolves nothing, for runners without codecs.

    use std::sync::Arc;

    use async_trait::async_trait;
    use sluice_core::{
        Decoder, DecoderRunner, Encoder, Envelope, FilterRunner, OutputRunner, PluginHelper,
    };

    pub struct NullHelper;

    #[async_trait]
    impl PluginHelper for NullHelper {
        fn output(&self, _name: &str) -> Option<Arc<dyn OutputRunner>> {
            None
        }

        fn filter(&self, _name: &str) -> Option<Arc<dyn FilterRunner>> {
            None
        }

        fn decoder(&self, _name: &str) -> Option<Box<dyn Decoder>> {
            None
        }

        fn encoder(&self, _base_name: &str, _full_name: &str) -> Option<Arc<dyn Encoder>> {
            None
        }

        fn decoder_runner(
            &self,
            _base_name: &str,
            _full_name: &str,
        ) -> Option<Arc<dyn DecoderRunner>> {
            None
        }

        fn stop_decoder_runner(&self, _runner: &Arc<dyn DecoderRunner>) -> bool {
            false
        }

        fn hostname(&self) -> &str {
            "null-host"
        }

        async fn pipeline_pack(&self, _msg_loop_count: u32) -> Option<Envelope> {
            None
        }
    }
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composite decoder delegating to named sub-decoders.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sluice_core::{
    ConfigDefaults, ConfigSchema, Decoder, Envelope, Plugin, PluginConfig, PluginError,
    PluginHelper, TypedSchema, WantsHelper, WantsName,
};
use strum::Display;
use tracing::debug;

/// How sub-decoders are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CascadeStrategy {
    /// Try each sub-decoder in order; the first success wins.
    #[default]
    FirstWins,
    /// Apply every sub-decoder in order; any failure fails the decode.
    All,
}

/// Settings for [`MultiDecoder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiDecoderConfig {
    /// Names of the decoder sections to delegate to, in order.
    #[serde(default)]
    pub subs: Vec<String>,
    /// How the sub-decoders are tried.
    #[serde(default)]
    pub cascade_strategy: CascadeStrategy,
    /// Log each sub-decoder failure at debug level.
    #[serde(default)]
    pub log_sub_errors: bool,
}

impl ConfigDefaults for MultiDecoderConfig {}

/// A decoder that cascades over other configured decoders.
#[derive(Default)]
pub struct MultiDecoder {
    name: String,
    helper: Option<Arc<dyn PluginHelper>>,
    strategy: CascadeStrategy,
    log_sub_errors: bool,
    decoders: Vec<(String, Box<dyn Decoder>)>,
}

impl MultiDecoder {
    /// Names of the resolved sub-decoders, in cascade order.
    pub fn sub_names(&self) -> Vec<&str> {
        self.decoders.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn decode_first_wins(&mut self, envelope: &mut Envelope) -> Result<(), PluginError> {
        let original = envelope.message().clone();
        for (sub, decoder) in &mut self.decoders {
            match decoder.decode(envelope) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if self.log_sub_errors {
                        debug!(decoder = %self.name, sub = %sub, error = %err, "sub-decoder failed");
                    }
                    *envelope.message_mut() = original.clone();
                }
            }
        }
        Err(format!("{}: no sub-decoder succeeded", self.name).into())
    }

    fn decode_all(&mut self, envelope: &mut Envelope) -> Result<(), PluginError> {
        for (sub, decoder) in &mut self.decoders {
            decoder
                .decode(envelope)
                .map_err(|err| format!("{}: sub-decoder '{sub}' failed: {err}", self.name))?;
        }
        Ok(())
    }
}

impl Plugin for MultiDecoder {
    fn init(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        let config = config
            .typed::<MultiDecoderConfig>()
            .ok_or("multi-decoder requires a typed config")?;
        if config.subs.is_empty() {
            return Err("at least one sub-decoder must be listed in 'subs'".into());
        }
        let helper = self
            .helper
            .clone()
            .ok_or("multi-decoder requires the plugin helper")?;

        let mut decoders = Vec::with_capacity(config.subs.len());
        for sub in &config.subs {
            let decoder = helper
                .decoder(sub)
                .ok_or_else(|| format!("sub-decoder '{sub}' not found"))?;
            decoders.push((sub.clone(), decoder));
        }

        self.strategy = config.cascade_strategy;
        self.log_sub_errors = config.log_sub_errors;
        self.decoders = decoders;
        Ok(())
    }

    fn config_schema(&self) -> Option<Box<dyn ConfigSchema>> {
        Some(Box::new(TypedSchema::new(MultiDecoderConfig::default())))
    }

    fn wants_helper(&mut self) -> Option<&mut dyn WantsHelper> {
        Some(self)
    }

    fn wants_name(&mut self) -> Option<&mut dyn WantsName> {
        Some(self)
    }
}

impl WantsHelper for MultiDecoder {
    fn set_helper(&mut self, helper: Arc<dyn PluginHelper>) {
        self.helper = Some(helper);
    }
}

impl WantsName for MultiDecoder {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl Decoder for MultiDecoder {
    fn decode(&mut self, envelope: &mut Envelope) -> Result<(), PluginError> {
        match self.strategy {
            CascadeStrategy::FirstWins => self.decode_first_wins(envelope),
            CascadeStrategy::All => self.decode_all(envelope),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use sluice_core::{DecoderRunner, Encoder, FilterRunner, Message, OutputRunner};

    use super::*;

    /// Sets the payload to a fixed value, or fails when the payload is "bad".
    struct TagDecoder(&'static str);

    impl Plugin for TagDecoder {
        fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl Decoder for TagDecoder {
        fn decode(&mut self, envelope: &mut Envelope) -> Result<(), PluginError> {
            if envelope.payload == "bad" {
                return Err("bad payload".into());
            }
            envelope.set_field(self.0, "yes");
            Ok(())
        }
    }

    /// Rejects everything after scribbling on the message.
    struct FailingDecoder;

    impl Plugin for FailingDecoder {
        fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl Decoder for FailingDecoder {
        fn decode(&mut self, envelope: &mut Envelope) -> Result<(), PluginError> {
            envelope.payload = "scribbled".into();
            Err("always fails".into())
        }
    }

    struct StubHelper;

    #[async_trait]
    impl PluginHelper for StubHelper {
        fn output(&self, _name: &str) -> Option<Arc<dyn OutputRunner>> {
            None
        }
        fn filter(&self, _name: &str) -> Option<Arc<dyn FilterRunner>> {
            None
        }
        fn decoder(&self, name: &str) -> Option<Box<dyn Decoder>> {
            match name {
                "fail" => Some(Box::new(FailingDecoder)),
                "a" => Some(Box::new(TagDecoder("a"))),
                "b" => Some(Box::new(TagDecoder("b"))),
                _ => None,
            }
        }
        fn encoder(&self, _base: &str, _full: &str) -> Option<Arc<dyn Encoder>> {
            None
        }
        fn decoder_runner(&self, _base: &str, _full: &str) -> Option<Arc<dyn DecoderRunner>> {
            None
        }
        fn stop_decoder_runner(&self, _runner: &Arc<dyn DecoderRunner>) -> bool {
            false
        }
        fn hostname(&self) -> &str {
            "test"
        }
        async fn pipeline_pack(&self, _msg_loop_count: u32) -> Option<Envelope> {
            None
        }
    }

    fn configured(section: &str) -> Result<MultiDecoder, PluginError> {
        let mut decoder = MultiDecoder::default();
        decoder.set_name("multi");
        decoder.set_helper(Arc::new(StubHelper));
        let mut schema = decoder.config_schema().unwrap();
        schema.decode(&section.parse().unwrap(), &["type"]).unwrap();
        decoder.init(&PluginConfig::Typed(schema))?;
        Ok(decoder)
    }

    fn envelope(payload: &str) -> Envelope {
        Envelope::new(Message {
            payload: payload.into(),
            ..Default::default()
        })
    }

    #[test]
    fn first_wins_restores_message_between_attempts() {
        let mut decoder = configured("subs = [\"fail\", \"a\", \"b\"]").unwrap();
        assert_eq!(decoder.sub_names(), vec!["fail", "a", "b"]);

        let mut env = envelope("raw");
        decoder.decode(&mut env).unwrap();
        assert_eq!(env.payload, "raw");
        assert_eq!(env.field("a"), Some("yes"));
        assert_eq!(env.field("b"), None);
    }

    #[test]
    fn first_wins_fails_when_every_sub_fails() {
        let mut decoder = configured("subs = [\"fail\", \"a\"]").unwrap();
        assert!(decoder.decode(&mut envelope("bad")).is_err());
    }

    #[test]
    fn all_strategy_applies_every_sub() {
        let mut decoder =
            configured("subs = [\"a\", \"b\"]\ncascade_strategy = \"all\"").unwrap();
        let mut env = envelope("raw");
        decoder.decode(&mut env).unwrap();
        assert_eq!(env.field("a"), Some("yes"));
        assert_eq!(env.field("b"), Some("yes"));
    }

    #[test]
    fn unknown_sub_fails_init() {
        let err = configured("subs = [\"a\", \"nope\"]").err().unwrap();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn empty_subs_fails_init() {
        assert!(configured("subs = []").is_err());
    }
}

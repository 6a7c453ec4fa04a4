// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin makers.
//!
//! A [`PluginMaker`] owns one configuration section. It resolves the
//! section's plugin type and category up front, decodes the plugin's own
//! schema once, and then builds any number of fresh instances or runners
//! from that prepared configuration.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use sluice_config::diagnostic::suggest_key;
use sluice_config::model::{consumed_keys, from_section};
use sluice_config::{CommonConfig, CommonFoConfig, CommonInputConfig};
use sluice_core::{
    PluginCategory, PluginConfig, PluginDefaults, PluginHandle, PluginHelper, SchemaError,
    SluiceError,
};
use sluice_plugin::{PluginFactory, PluginRegistry};

use crate::context::RunnerContext;
use crate::runner::{DecRunner, FoRunner, InRunner, RunnerHandle};

/// Category-specific common settings decoded from a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryConfig {
    None,
    Input(CommonInputConfig),
    Fo(CommonFoConfig),
}

impl CategoryConfig {
    fn apply_defaults(&mut self, defaults: &PluginDefaults, category: PluginCategory) {
        match self {
            Self::None => {}
            Self::Input(config) => config.apply_defaults(defaults),
            Self::Fo(config) => config.apply_defaults(defaults, category),
        }
    }

    /// Unset tri-state flags become `false`.
    fn resolved(mut self) -> Self {
        match &mut self {
            Self::None => {}
            Self::Input(config) => {
                config.synchronous_decode = Some(config.synchronous_decode.unwrap_or(false));
                config.send_decode_failures = Some(config.send_decode_failures.unwrap_or(false));
            }
            Self::Fo(config) => {
                config.can_exit = Some(config.can_exit.unwrap_or(false));
                config.use_framing = Some(config.use_framing.unwrap_or(false));
            }
        }
        self
    }

    fn input(&self) -> CommonInputConfig {
        match self {
            Self::Input(config) => config.clone(),
            _ => CommonInputConfig::default(),
        }
    }

    fn fo(&self) -> CommonFoConfig {
        match self {
            Self::Fo(config) => config.clone(),
            _ => CommonFoConfig::default(),
        }
    }
}

/// The decoded plugin config plus category settings merged with the
/// plugin's defaults.
#[derive(Debug)]
pub struct PreparedConfig {
    /// What the plugin's `init` receives.
    pub config: PluginConfig,
    /// Category settings with plugin defaults applied.
    pub common: CategoryConfig,
}

#[derive(Default)]
struct MakerState {
    prepared: Option<Arc<PreparedConfig>>,
    /// Instance created while preparing, handed out by the next `make`.
    cached: Option<PluginHandle>,
}

/// Builds plugin instances and runners for one configuration section.
pub struct PluginMaker {
    name: String,
    plugin_type: String,
    category: PluginCategory,
    section: toml::Table,
    category_common: CategoryConfig,
    factory: Arc<dyn PluginFactory>,
    helper: Weak<dyn PluginHelper>,
    state: Mutex<MakerState>,
}

impl PluginMaker {
    /// Resolve the section's type, factory, and category.
    ///
    /// The type defaults to `name` when the section has no `type` key.
    pub fn new(
        name: impl Into<String>,
        section: toml::Table,
        registry: &PluginRegistry,
        helper: Weak<dyn PluginHelper>,
    ) -> Result<Self, SluiceError> {
        let name = name.into();
        let invalid = |err: toml::de::Error| SluiceError::InvalidConfig {
            plugin: name.clone(),
            message: err.message().to_string(),
        };

        let common: CommonConfig = from_section(&section).map_err(invalid)?;
        let plugin_type = common.plugin_type.unwrap_or_else(|| name.clone());
        let factory = registry
            .get(&plugin_type)
            .ok_or_else(|| SluiceError::UnknownPluginType(plugin_type.clone()))?;
        let category = PluginCategory::from_type_name(&plugin_type).ok_or_else(|| {
            SluiceError::UnrecognizedCategory {
                plugin_type: plugin_type.clone(),
            }
        })?;
        let category_common = match category {
            PluginCategory::Input => CategoryConfig::Input(from_section(&section).map_err(invalid)?),
            PluginCategory::Filter | PluginCategory::Output => {
                CategoryConfig::Fo(from_section(&section).map_err(invalid)?)
            }
            PluginCategory::Decoder | PluginCategory::Encoder => CategoryConfig::None,
        };

        debug!(plugin = %name, plugin_type = %plugin_type, category = %category, "created maker");
        Ok(Self {
            name,
            plugin_type,
            category,
            section,
            category_common,
            factory,
            helper,
            state: Mutex::new(MakerState::default()),
        })
    }

    /// Section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered plugin type, the section name unless `type` is set.
    pub fn plugin_type(&self) -> &str {
        &self.plugin_type
    }

    /// Category derived from the plugin type's suffix.
    pub fn category(&self) -> PluginCategory {
        self.category
    }

    /// The raw configuration section.
    pub fn section(&self) -> &toml::Table {
        &self.section
    }

    /// A fresh, uninitialized instance with the helper and name injected
    /// when the plugin asks for them.
    pub fn make_instance(&self) -> Result<PluginHandle, SluiceError> {
        let mut handle = self.factory.create();
        if handle.category() != self.category {
            return Err(SluiceError::CategoryMismatch {
                plugin: self.name.clone(),
                plugin_type: self.plugin_type.clone(),
                expected: self.category,
            });
        }

        if let Some(target) = handle.wants_helper() {
            match self.helper.upgrade() {
                Some(helper) => target.set_helper(helper),
                None => warn!(plugin = %self.name, "pipeline helper no longer available"),
            }
        }
        if let Some(target) = handle.wants_name() {
            target.set_name(&self.name);
        }
        Ok(handle)
    }

    /// Decode the section against the plugin's schema. Runs once; later
    /// calls return the same prepared config.
    pub fn prepare_config(&self) -> Result<Arc<PreparedConfig>, SluiceError> {
        let mut state = lock(&self.state);
        if let Some(prepared) = &state.prepared {
            return Ok(Arc::clone(prepared));
        }

        let handle = match state.cached.take() {
            Some(handle) => handle,
            None => self.make_instance()?,
        };
        let result = self.decode_config(&handle);
        state.cached = Some(handle);

        let prepared = Arc::new(result?);
        state.prepared = Some(Arc::clone(&prepared));
        Ok(prepared)
    }

    fn decode_config(&self, handle: &PluginHandle) -> Result<PreparedConfig, SluiceError> {
        let consumed = consumed_keys(self.category);
        let (config, defaults) = match handle.config_schema() {
            Some(mut schema) => {
                let defaults = schema.defaults();
                schema
                    .decode(&self.section, consumed)
                    .map_err(|err| match err {
                        SchemaError::UnknownKey { key, expected } => {
                            let valid: Vec<&str> = expected
                                .iter()
                                .map(String::as_str)
                                .chain(consumed.iter().copied())
                                .collect();
                            SluiceError::UnknownConfigKey {
                                plugin: self.name.clone(),
                                suggestion: suggest_key(&key, &valid),
                                key,
                            }
                        }
                        SchemaError::Invalid(message) => SluiceError::InvalidConfig {
                            plugin: self.name.clone(),
                            message,
                        },
                    })?;
                (PluginConfig::Typed(schema), defaults)
            }
            None => (
                PluginConfig::Generic(self.section.clone()),
                PluginDefaults::default(),
            ),
        };

        let mut common = self.category_common.clone();
        common.apply_defaults(&defaults, self.category);
        Ok(PreparedConfig { config, common })
    }

    /// The category settings after plugin defaults were merged in.
    pub fn category_config(&self) -> Result<CategoryConfig, SluiceError> {
        Ok(self.prepare_config()?.common.clone())
    }

    /// A new, initialized instance. Each call returns a distinct instance.
    pub fn make(&self) -> Result<PluginHandle, SluiceError> {
        let prepared = self.prepare_config()?;
        let cached = lock(&self.state).cached.take();
        let mut handle = match cached {
            Some(handle) => handle,
            None => self.make_instance()?,
        };
        handle
            .init(&prepared.config)
            .map_err(|source| SluiceError::InitializationFailed {
                plugin: self.name.clone(),
                source,
            })?;
        Ok(handle)
    }

    /// Build a runner around a new instance. The runner is named `name`, or
    /// the maker's name when `None`. Encoders have no runner.
    pub fn make_runner(
        &self,
        name: Option<&str>,
        ctx: &RunnerContext,
    ) -> Result<RunnerHandle, SluiceError> {
        if self.category == PluginCategory::Encoder {
            return Err(SluiceError::EncodersNotRunnable {
                plugin: self.name.clone(),
            });
        }

        let name = name.unwrap_or(&self.name);
        let common = self.prepare_config()?.common.clone().resolved();
        let runner = match self.make()? {
            PluginHandle::Decoder(decoder) => {
                RunnerHandle::Decoder(DecRunner::new(name, decoder, ctx.chan_size))
            }
            PluginHandle::Input(input) => {
                RunnerHandle::Input(InRunner::new(name, input, common.input(), ctx.clone()))
            }
            PluginHandle::Filter(filter) => {
                RunnerHandle::Filter(FoRunner::new_filter(name, filter, common.fo(), ctx.clone())?)
            }
            PluginHandle::Output(output) => {
                RunnerHandle::Output(FoRunner::new_output(name, output, common.fo(), ctx.clone())?)
            }
            PluginHandle::Encoder(_) => {
                return Err(SluiceError::EncodersNotRunnable {
                    plugin: self.name.clone(),
                });
            }
        };
        Ok(runner)
    }
}

impl fmt::Debug for PluginMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginMaker")
            .field("name", &self.name)
            .field("plugin_type", &self.plugin_type)
            .field("category", &self.category)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::{Deserialize, Serialize};
    use sluice_config::GlobalConfig;
    use sluice_core::{
        ConfigDefaults, ConfigSchema, Encoder, Message, Plugin, PluginError, TypedSchema,
    };
    use sluice_test_utils::{Recorder, StrictFilterConfig, mock_registry};

    use super::*;
    use crate::runner::testing::NullHelper;

    fn no_helper() -> Weak<dyn PluginHelper> {
        Weak::<NullHelper>::new()
    }

    fn section(text: &str) -> toml::Table {
        toml::from_str(text).unwrap()
    }

    fn maker(name: &str, text: &str) -> Result<PluginMaker, SluiceError> {
        let registry = mock_registry(&Recorder::new());
        PluginMaker::new(name, section(text), &registry, no_helper())
    }

    /// Numbers every instance it creates.
    struct TaggedEncoder {
        id: usize,
    }

    impl Plugin for TaggedEncoder {
        fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl Encoder for TaggedEncoder {
        fn encode(&self, _message: &Message) -> Result<Vec<u8>, PluginError> {
            Ok(self.id.to_le_bytes().to_vec())
        }
    }

    /// Deliberately without `deny_unknown_fields`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct PrefixConfig {
        prefix: String,
    }

    impl ConfigDefaults for PrefixConfig {}

    struct PrefixEncoder;

    impl Plugin for PrefixEncoder {
        fn init(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
            Ok(())
        }

        fn config_schema(&self) -> Option<Box<dyn ConfigSchema>> {
            Some(Box::new(TypedSchema::new(PrefixConfig::default())))
        }
    }

    impl Encoder for PrefixEncoder {
        fn encode(&self, message: &Message) -> Result<Vec<u8>, PluginError> {
            Ok(message.payload.as_bytes().to_vec())
        }
    }

    fn prefix_maker(text: &str) -> PluginMaker {
        let mut registry = PluginRegistry::new();
        registry.register("PrefixEncoder", || PluginHandle::Encoder(Box::new(PrefixEncoder)));
        PluginMaker::new("prefix", section(text), &registry, no_helper()).unwrap()
    }

    #[test]
    fn type_defaults_to_section_name() {
        let maker = maker("CountingInput", "").unwrap();
        assert_eq!(maker.plugin_type(), "CountingInput");
        assert_eq!(maker.category(), PluginCategory::Input);
    }

    #[test]
    fn unknown_type_is_reported_before_category() {
        let err = maker("tail", "type = 'Mystery'").unwrap_err();
        assert!(matches!(err, SluiceError::UnknownPluginType(ref t) if t == "Mystery"));
    }

    #[test]
    fn unrecognized_category() {
        let mut registry = PluginRegistry::new();
        registry.register("Gizmo", || PluginHandle::Encoder(Box::new(TaggedEncoder { id: 0 })));
        let err = PluginMaker::new("gizmo", section("type = 'Gizmo'"), &registry, no_helper())
            .unwrap_err();
        assert!(matches!(err, SluiceError::UnrecognizedCategory { .. }));
    }

    #[test]
    fn category_mismatch_is_caught_at_instance_creation() {
        let mut registry = PluginRegistry::new();
        registry.register("LyingOutput", || {
            PluginHandle::Encoder(Box::new(TaggedEncoder { id: 0 }))
        });
        let maker =
            PluginMaker::new("liar", section("type = 'LyingOutput'\nmessage_matcher = 'TRUE'"), &registry, no_helper())
                .unwrap();
        let err = maker.make_instance().unwrap_err();
        assert!(matches!(err, SluiceError::CategoryMismatch { expected: PluginCategory::Output, .. }));
    }

    #[test]
    fn bad_common_value_is_invalid_config() {
        let err = maker("CountingInput", "ticker_interval = 'soon'").unwrap_err();
        assert!(matches!(err, SluiceError::InvalidConfig { .. }));
    }

    #[test]
    fn unknown_key_names_the_key() {
        let maker = maker("strict", "type = 'StrictFilter'\nthreshhold = 3").unwrap();
        match maker.prepare_config().unwrap_err() {
            SluiceError::UnknownConfigKey {
                plugin,
                key,
                suggestion,
            } => {
                assert_eq!(plugin, "strict");
                assert_eq!(key, "threshhold");
                assert_eq!(suggestion.as_deref(), Some("threshold"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_key_is_rejected_for_lax_schema_structs() {
        let maker = prefix_maker("type = 'PrefixEncoder'\nprefix = '>'\nprefx = '<'");
        match maker.prepare_config().unwrap_err() {
            SluiceError::UnknownConfigKey {
                plugin,
                key,
                suggestion,
            } => {
                assert_eq!(plugin, "prefix");
                assert_eq!(key, "prefx");
                assert_eq!(suggestion.as_deref(), Some("prefix"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let maker = prefix_maker("type = 'PrefixEncoder'\nprefix = '>'");
        let prepared = maker.prepare_config().unwrap();
        assert_eq!(prepared.config.typed::<PrefixConfig>().unwrap().prefix, ">");
    }

    #[test]
    fn common_keys_pass_strict_decoding() {
        let maker = maker(
            "strict",
            "type = 'StrictFilter'\nthreshold = 3\nmessage_matcher = 'TRUE'\ncan_exit = false\n[retries]\nmax_retries = 2",
        )
        .unwrap();
        let prepared = maker.prepare_config().unwrap();
        let config = prepared.config.typed::<StrictFilterConfig>().unwrap();
        assert_eq!(config.threshold, 3);
        assert_eq!(config.label, "strict");
    }

    #[test]
    fn schemaless_plugin_gets_generic_section() {
        let maker = maker("rec", "type = 'RecordingOutput'\nmessage_matcher = 'TRUE'\nanything = 1").unwrap();
        let prepared = maker.prepare_config().unwrap();
        let table = prepared.config.generic().unwrap();
        assert_eq!(table.get("anything").and_then(|v| v.as_integer()), Some(1));
    }

    #[test]
    fn defaults_fill_only_unset_fields() {
        let maker = maker("strict", "type = 'StrictFilter'\nticker_interval = 9").unwrap();
        let CategoryConfig::Fo(config) = maker.category_config().unwrap() else {
            panic!("expected filter settings");
        };
        // user value wins over the plugin default
        assert_eq!(config.ticker_interval, 9);
        // plugin defaults fill the gaps
        assert_eq!(config.message_matcher, "Type == 'metric'");
        assert_eq!(config.can_exit, Some(true));
        // no default anywhere: framework default
        assert_eq!(config.use_framing, None);
        assert!(config.encoder.is_empty());
    }

    #[test]
    fn explicit_false_beats_plugin_default() {
        let maker = maker("strict", "type = 'StrictFilter'\ncan_exit = false").unwrap();
        let CategoryConfig::Fo(config) = maker.category_config().unwrap() else {
            panic!("expected filter settings");
        };
        assert_eq!(config.can_exit, Some(false));
    }

    #[test]
    fn prepare_is_idempotent() {
        let maker = maker("strict", "type = 'StrictFilter'").unwrap();
        let first = maker.prepare_config().unwrap();
        let second = maker.prepare_config().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn make_returns_distinct_instances() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let mut registry = PluginRegistry::new();
        registry.register("TaggedEncoder", move || {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            PluginHandle::Encoder(Box::new(TaggedEncoder { id }))
        });
        let maker = PluginMaker::new("TaggedEncoder", toml::Table::new(), &registry, no_helper())
            .unwrap();

        maker.prepare_config().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1);

        let first = maker.make().unwrap().into_encoder().unwrap();
        let second = maker.make().unwrap().into_encoder().unwrap();
        // the first make consumes the instance cached by preparation
        assert_eq!(created.load(Ordering::SeqCst), 2);
        let message = Message::default();
        assert_ne!(first.encode(&message).unwrap(), second.encode(&message).unwrap());
    }

    #[test]
    fn init_failure_carries_plugin_error() {
        let maker = maker("broken", "type = 'FailingOutput'\nmessage_matcher = 'TRUE'").unwrap();
        match maker.make().unwrap_err() {
            SluiceError::InitializationFailed { plugin, source } => {
                assert_eq!(plugin, "broken");
                assert_eq!(source.to_string(), "refusing to start");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_init_sees_decoded_values() {
        let maker = maker("strict", "type = 'StrictFilter'\nthreshold = 0").unwrap();
        assert!(matches!(
            maker.make().unwrap_err(),
            SluiceError::InitializationFailed { .. }
        ));
    }

    #[test]
    fn encoders_are_not_runnable() {
        let maker = maker("NativeEncoder", "").unwrap();
        let ctx = RunnerContext::new(&GlobalConfig::default());
        assert!(matches!(
            maker.make_runner(None, &ctx).unwrap_err(),
            SluiceError::EncodersNotRunnable { .. }
        ));
    }

    #[test]
    fn runners_take_category_settings() {
        let ctx = RunnerContext::new(&GlobalConfig::default());

        let input = maker("counter", "type = 'CountingInput'\ndecoder = 'UppercaseDecoder'").unwrap();
        let RunnerHandle::Input(runner) = input.make_runner(Some("counter-1"), &ctx).unwrap() else {
            panic!("expected an input runner");
        };
        assert_eq!(runner.name(), "counter-1");
        assert_eq!(runner.config().decoder, "UppercaseDecoder");
        assert_eq!(runner.config().synchronous_decode, Some(false));

        let decoder = maker("UppercaseDecoder", "").unwrap();
        let handle = decoder.make_runner(None, &ctx).unwrap();
        assert_eq!(handle.category(), PluginCategory::Decoder);
        assert_eq!(handle.name(), "UppercaseDecoder");

        let output = maker("sink", "type = 'RecordingOutput'\nmessage_matcher = 'TRUE'").unwrap();
        let RunnerHandle::Output(runner) = output.make_runner(None, &ctx).unwrap() else {
            panic!("expected an output runner");
        };
        assert_eq!(runner.config().use_framing, Some(false));
        assert_eq!(runner.config().can_exit, Some(false));
    }

    #[test]
    fn filter_runner_needs_a_matcher() {
        let ctx = RunnerContext::new(&GlobalConfig::default());
        let maker = maker("rec", "type = 'RecordingFilter'").unwrap();
        assert!(matches!(
            maker.make_runner(None, &ctx).unwrap_err(),
            SluiceError::InvalidMatcher { .. }
        ));
    }
}

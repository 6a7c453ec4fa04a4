// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin configuration schemas.
//!
//! A plugin that wants strict configuration exposes a [`ConfigSchema`],
//! usually a [`TypedSchema`] over its own config struct. Decoding layers the
//! section over the struct's defaults with figment, so keys the user leaves
//! out keep the plugin's values. Keys the struct has no field for are
//! rejected whether or not it is marked `#[serde(deny_unknown_fields)]`.

use std::any::Any;
use std::fmt;

use figment::Figment;
use figment::error::Kind;
use figment::providers::Serialized;
use figment::value::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Defaults a plugin declares for the framework-owned settings.
///
/// `None` leaves the framework default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDefaults {
    /// Default ticker interval in seconds.
    pub ticker_interval: Option<u64>,
    /// Default matcher expression.
    pub message_matcher: Option<String>,
    /// Default decoder section.
    pub decoder: Option<String>,
    /// Default encoder section.
    pub encoder: Option<String>,
    /// Default synchronous decode flag.
    pub synchronous_decode: Option<bool>,
    /// Default flag for forwarding decode failures.
    pub send_decode_failures: Option<bool>,
    /// Default `can_exit` flag.
    pub can_exit: Option<bool>,
    /// Default framing flag.
    pub use_framing: Option<bool>,
}

/// Implemented by plugin config structs to declare framework defaults.
pub trait ConfigDefaults {
    fn defaults(&self) -> PluginDefaults {
        PluginDefaults::default()
    }
}

/// Why a section did not decode into a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown key '{key}'")]
    UnknownKey { key: String, expected: Vec<String> },

    #[error("{0}")]
    Invalid(String),
}

/// A decodable, type-specific configuration record.
pub trait ConfigSchema: Send + Sync + 'static {
    /// Decode `section` into the schema, ignoring unknown keys listed in
    /// `consumed` (they belong to the common settings).
    fn decode(&mut self, section: &toml::Table, consumed: &[&str]) -> Result<(), SchemaError>;

    fn defaults(&self) -> PluginDefaults;

    /// The decoded value, for downcasting by the owning plugin.
    fn as_any(&self) -> &dyn Any;
}

/// A [`ConfigSchema`] backed by a serde struct.
#[derive(Debug, Clone)]
pub struct TypedSchema<T> {
    value: T,
}

impl<T> TypedSchema<T> {
    /// Start from `value`, normally the plugin's default-populated config.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// The current, possibly decoded, value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> ConfigSchema for TypedSchema<T>
where
    T: Serialize + DeserializeOwned + ConfigDefaults + Send + Sync + 'static,
{
    fn decode(&mut self, section: &toml::Table, consumed: &[&str]) -> Result<(), SchemaError> {
        let mut table = section.clone();
        loop {
            let extracted = Figment::from(Serialized::defaults(&self.value))
                .merge(Serialized::defaults(&table))
                .extract::<T>();
            let err = match extracted {
                Ok(value) => {
                    let fields = field_names(&value)?;
                    if let Some(key) = table
                        .keys()
                        .find(|key| !consumed.contains(&key.as_str()) && !fields.contains(key))
                    {
                        return Err(SchemaError::UnknownKey {
                            key: key.clone(),
                            expected: fields,
                        });
                    }
                    self.value = value;
                    return Ok(());
                }
                Err(err) => err,
            };
            let message = err.to_string();
            match err.kind {
                Kind::UnknownField(field, expected) => {
                    if consumed.contains(&field.as_str()) && table.remove(&field).is_some() {
                        continue;
                    }
                    return Err(SchemaError::UnknownKey {
                        key: field,
                        expected: expected.iter().map(|s| s.to_string()).collect(),
                    });
                }
                _ => return Err(SchemaError::Invalid(message)),
            }
        }
    }

    fn defaults(&self) -> PluginDefaults {
        self.value.defaults()
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }
}

/// Top-level field names of a decoded config struct.
fn field_names<T: Serialize>(value: &T) -> Result<Vec<String>, SchemaError> {
    match Value::serialize(value) {
        Ok(Value::Dict(_, dict)) => Ok(dict.into_keys().collect()),
        Ok(_) => Ok(Vec::new()),
        Err(err) => Err(SchemaError::Invalid(err.to_string())),
    }
}

/// The configuration handed to [`Plugin::init`](crate::Plugin::init).
pub enum PluginConfig {
    /// Strictly decoded, type-specific config.
    Typed(Box<dyn ConfigSchema>),
    /// The raw section, for plugins without a schema.
    Generic(toml::Table),
}

impl PluginConfig {
    /// Downcast a typed config to the plugin's struct.
    pub fn typed<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Typed(schema) => schema.as_any().downcast_ref::<T>(),
            Self::Generic(_) => None,
        }
    }

    /// The raw section of a schema-less plugin.
    pub fn generic(&self) -> Option<&toml::Table> {
        match self {
            Self::Typed(_) => None,
            Self::Generic(table) => Some(table),
        }
    }

    /// Framework defaults declared by the schema, if any.
    pub fn defaults(&self) -> PluginDefaults {
        match self {
            Self::Typed(schema) => schema.defaults(),
            Self::Generic(_) => PluginDefaults::default(),
        }
    }
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typed(_) => f.write_str("PluginConfig::Typed(..)"),
            Self::Generic(table) => f.debug_tuple("PluginConfig::Generic").field(table).finish(),
        }
    }
}

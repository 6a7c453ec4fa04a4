// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base plugin trait, optional capabilities, and the category-tagged handle.

use std::fmt;
use std::sync::Arc;

use crate::schema::{ConfigSchema, PluginConfig};
use crate::traits::{Decoder, Encoder, Filter, Input, Output, PluginHelper};
use crate::types::PluginCategory;

/// Errors raised by plugin code.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// Base trait shared by every plugin category.
pub trait Plugin: Send + Sync + 'static {
    /// Initialize the plugin from its decoded configuration.
    fn init(&mut self, config: &PluginConfig) -> Result<(), PluginError>;

    /// A type-specific schema with plugin defaults. Plugins without one
    /// receive the raw section.
    fn config_schema(&self) -> Option<Box<dyn ConfigSchema>> {
        None
    }

    /// Plugins that need pipeline access return themselves here.
    fn wants_helper(&mut self) -> Option<&mut dyn WantsHelper> {
        None
    }

    /// Plugins that want their configured name return themselves here.
    fn wants_name(&mut self) -> Option<&mut dyn WantsName> {
        None
    }
}

/// Capability: receive the pipeline helper before `init`.
pub trait WantsHelper {
    fn set_helper(&mut self, helper: Arc<dyn PluginHelper>);
}

/// Capability: receive the configured plugin name before `init`.
pub trait WantsName {
    fn set_name(&mut self, name: &str);
}

/// A freshly constructed plugin, tagged with its category.
pub enum PluginHandle {
    Input(Box<dyn Input>),
    Decoder(Box<dyn Decoder>),
    Filter(Box<dyn Filter>),
    Encoder(Box<dyn Encoder>),
    Output(Box<dyn Output>),
}

macro_rules! dispatch {
    ($handle:expr, $plugin:ident => $body:expr) => {
        match $handle {
            PluginHandle::Input($plugin) => $body,
            PluginHandle::Decoder($plugin) => $body,
            PluginHandle::Filter($plugin) => $body,
            PluginHandle::Encoder($plugin) => $body,
            PluginHandle::Output($plugin) => $body,
        }
    };
}

impl PluginHandle {
    /// Category of the wrapped plugin.
    pub fn category(&self) -> PluginCategory {
        match self {
            Self::Input(_) => PluginCategory::Input,
            Self::Decoder(_) => PluginCategory::Decoder,
            Self::Filter(_) => PluginCategory::Filter,
            Self::Encoder(_) => PluginCategory::Encoder,
            Self::Output(_) => PluginCategory::Output,
        }
    }

    /// Forward to [`Plugin::init`].
    pub fn init(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        dispatch!(self, plugin => plugin.init(config))
    }

    /// Forward to [`Plugin::config_schema`].
    pub fn config_schema(&self) -> Option<Box<dyn ConfigSchema>> {
        dispatch!(self, plugin => plugin.config_schema())
    }

    /// Forward to [`Plugin::wants_helper`].
    pub fn wants_helper(&mut self) -> Option<&mut dyn WantsHelper> {
        dispatch!(self, plugin => plugin.wants_helper())
    }

    /// Forward to [`Plugin::wants_name`].
    pub fn wants_name(&mut self) -> Option<&mut dyn WantsName> {
        dispatch!(self, plugin => plugin.wants_name())
    }

    /// The input, if this is one.
    pub fn into_input(self) -> Option<Box<dyn Input>> {
        match self {
            Self::Input(plugin) => Some(plugin),
            _ => None,
        }
    }

    /// The decoder, if this is one.
    pub fn into_decoder(self) -> Option<Box<dyn Decoder>> {
        match self {
            Self::Decoder(plugin) => Some(plugin),
            _ => None,
        }
    }

    /// The filter, if this is one.
    pub fn into_filter(self) -> Option<Box<dyn Filter>> {
        match self {
            Self::Filter(plugin) => Some(plugin),
            _ => None,
        }
    }

    /// The encoder, if this is one.
    pub fn into_encoder(self) -> Option<Box<dyn Encoder>> {
        match self {
            Self::Encoder(plugin) => Some(plugin),
            _ => None,
        }
    }

    /// The output, if this is one.
    pub fn into_output(self) -> Option<Box<dyn Output>> {
        match self {
            Self::Output(plugin) => Some(plugin),
            _ => None,
        }
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginHandle::{}(..)", self.category())
    }
}

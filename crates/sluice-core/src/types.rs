// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across plugin traits and the Sluice pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// The category of a plugin, derived from the suffix of its type name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum PluginCategory {
    Input,
    Decoder,
    Filter,
    Encoder,
    Output,
}

impl PluginCategory {
    /// Order in which categories are loaded from a configuration document.
    /// Codecs come first so inputs and outputs can resolve them by name.
    pub const LOAD_ORDER: [PluginCategory; 5] = [
        PluginCategory::Decoder,
        PluginCategory::Encoder,
        PluginCategory::Input,
        PluginCategory::Filter,
        PluginCategory::Output,
    ];

    /// The type-name suffix that identifies this category.
    pub fn suffix(self) -> &'static str {
        self.into()
    }

    /// Derive the category from a plugin type name such as `"TcpInput"`.
    ///
    /// The longest matching suffix wins.
    pub fn from_type_name(plugin_type: &str) -> Option<Self> {
        Self::LOAD_ORDER
            .into_iter()
            .filter(|category| plugin_type.ends_with(category.suffix()))
            .max_by_key(|category| category.suffix().len())
    }
}

/// Which envelope pool an acquisition draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EnvelopeSource {
    /// Fresh data entering the pipeline through an input.
    External,
    /// Messages re-injected into the router by filters.
    Reinjected,
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsed configuration documents.
//!
//! A document is an ordered list of named sections. Every top-level table
//! except the daemon section configures one plugin.

use sluice_core::SluiceError;

/// Name of the section holding daemon-wide settings.
pub const DAEMON_SECTION: &str = "sluiced";

/// An ordered set of configuration sections.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    sections: Vec<(String, toml::Table)>,
}

impl ConfigDocument {
    /// Parse already-preprocessed configuration text.
    pub fn parse(text: &str) -> Result<Self, SluiceError> {
        let root: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| SluiceError::ConfigParse(e.to_string()))?;

        let mut sections = Vec::with_capacity(root.len());
        for (name, value) in root {
            match value {
                toml::Value::Table(table) => sections.push((name, table)),
                other => {
                    return Err(SluiceError::InvalidConfig {
                        plugin: name,
                        message: format!("expected a section, found {}", other.type_str()),
                    });
                }
            }
        }
        Ok(Self { sections })
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&toml::Table> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, table)| table)
    }

    /// The `[sluiced]` section, if present.
    pub fn daemon(&self) -> Option<&toml::Table> {
        self.section(DAEMON_SECTION)
    }

    /// Plugin sections in document order, skipping the daemon section.
    pub fn plugin_sections(&self) -> impl Iterator<Item = (&str, &toml::Table)> {
        self.sections
            .iter()
            .filter(|(name, _)| name != DAEMON_SECTION)
            .map(|(name, table)| (name.as_str(), table))
    }

    /// Number of sections, the daemon section included.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// True for an empty document.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading a configuration document into a [`Pipeline`].
//!
//! Every section gets a maker. Loading is best-effort: a failing section is
//! logged and counted while the rest still load, and the count is reported
//! at the end. Preprocessing errors, syntax errors, and multi-decoder cycles
//! abort immediately.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use sluice_config::{ConfigDocument, env_sub, replace_envs_file};
use sluice_core::{PluginCategory, SluiceError};
use sluice_plugin::{MULTI_DECODER, NATIVE_DECODER, NATIVE_ENCODER};

use crate::maker::PluginMaker;
use crate::pipeline::Pipeline;
use crate::resolver::{DependencyNode, order_dependencies};

impl Pipeline {
    /// Preprocess `%ENV[...]` references in `path` and load the result.
    pub fn load_from_file(&self, path: &Path) -> Result<(), SluiceError> {
        info!(path = %path.display(), "loading configuration");
        let text = replace_envs_file(path)?;
        self.load_preprocessed(&text)
    }

    /// Preprocess `%ENV[...]` references in `text` and load the result.
    pub fn load_from_str(&self, text: &str) -> Result<(), SluiceError> {
        let text = env_sub(text)?;
        self.load_preprocessed(&text)
    }

    fn load_preprocessed(&self, text: &str) -> Result<(), SluiceError> {
        let document = ConfigDocument::parse(text)?;
        self.load_document(&document)
    }

    /// Build, prepare, and register every section of `document`.
    pub fn load_document(&self, document: &ConfigDocument) -> Result<(), SluiceError> {
        let mut errors = 0usize;
        let mut by_category: HashMap<PluginCategory, Vec<Arc<PluginMaker>>> = HashMap::new();
        let mut multis = Vec::new();
        let mut names = HashSet::new();

        for (name, section) in document.plugin_sections() {
            debug!(section = %name, "pre-loading");
            match PluginMaker::new(name, section.clone(), self.registry(), self.helper_ref()) {
                Ok(maker) => {
                    names.insert(name.to_string());
                    let maker = Arc::new(maker);
                    if maker.plugin_type() == MULTI_DECODER {
                        multis.push(maker);
                    } else {
                        by_category.entry(maker.category()).or_default().push(maker);
                    }
                }
                Err(err) => {
                    self.record(err.to_string());
                    errors += 1;
                }
            }
        }

        for default in [NATIVE_DECODER, NATIVE_ENCODER] {
            if names.contains(default) {
                continue;
            }
            debug!(section = %default, "pre-loading default");
            match PluginMaker::new(default, toml::Table::new(), self.registry(), self.helper_ref()) {
                Ok(maker) => by_category
                    .entry(maker.category())
                    .or_default()
                    .push(Arc::new(maker)),
                Err(err) => {
                    self.record(err.to_string());
                    errors += 1;
                }
            }
        }

        let ordered = order_multi_decoders(multis).inspect_err(|err| self.record(err.to_string()))?;
        by_category
            .entry(PluginCategory::Decoder)
            .or_default()
            .extend(ordered);

        for category in PluginCategory::LOAD_ORDER {
            for maker in by_category.remove(&category).unwrap_or_default() {
                errors += self.load_maker(maker);
            }
        }

        if errors > 0 {
            return Err(SluiceError::LoadFailed { count: errors });
        }
        info!("configuration loaded");
        Ok(())
    }

    /// Prepare and register one maker and build its runner. Returns how
    /// many errors were recorded.
    fn load_maker(&self, maker: Arc<PluginMaker>) -> usize {
        debug!(plugin = %maker.name(), "loading");
        let mut errors = 0;
        if let Err(err) = maker.prepare_config() {
            self.record(err.to_string());
            errors += 1;
        }
        self.register_maker(Arc::clone(&maker));
        if maker.category() == PluginCategory::Encoder {
            return errors;
        }

        match maker.make_runner(None, self.context()) {
            Ok(runner) => self.register_runner(runner),
            // The same failure may already be on record from preparation.
            Err(err) if self.has_logged(&err.to_string()) => {}
            Err(err) => {
                self.record(format!("Error making runner for {}: {err}", maker.name()));
                errors += 1;
            }
        }
        errors
    }
}

/// Order multi-decoders so every sub-decoder loads before its parent.
fn order_multi_decoders(
    multis: Vec<Arc<PluginMaker>>,
) -> Result<Vec<Arc<PluginMaker>>, SluiceError> {
    let nodes = multis
        .iter()
        .map(|maker| DependencyNode::new(maker.name(), subs(maker.section())))
        .collect();
    let mut by_name: HashMap<String, Arc<PluginMaker>> = multis
        .into_iter()
        .map(|maker| (maker.name().to_string(), maker))
        .collect();

    Ok(order_dependencies(nodes)?
        .into_iter()
        .filter_map(|node| by_name.remove(&node.name))
        .collect())
}

fn subs(section: &toml::Table) -> Vec<String> {
    section
        .get("subs")
        .and_then(toml::Value::as_array)
        .map(|subs| {
            subs.iter()
                .filter_map(|sub| sub.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

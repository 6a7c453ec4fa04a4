// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of plugin types.
//!
//! The `PluginRegistry` maps a type name (as written in a section's `type`
//! key) to the factory that builds instances of it.

use std::collections::HashMap;
use std::sync::Arc;

use sluice_core::PluginHandle;
use tracing::debug;

/// Builds fresh, uninitialized plugin instances.
///
/// Any `Fn() -> PluginHandle` closure is a factory.
pub trait PluginFactory: Send + Sync {
    fn create(&self) -> PluginHandle;
}

impl<F> PluginFactory for F
where
    F: Fn() -> PluginHandle + Send + Sync,
{
    fn create(&self) -> PluginHandle {
        self()
    }
}

/// Plugin types known to the process, keyed by type name.
pub struct PluginRegistry {
    factories: HashMap<String, Arc<dyn PluginFactory>>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `type_name`, replacing any earlier one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: PluginFactory + 'static,
    {
        let type_name = type_name.into();
        if self
            .factories
            .insert(type_name.clone(), Arc::new(factory))
            .is_some()
        {
            debug!(plugin_type = %type_name, "replaced registered plugin factory");
        }
    }

    /// Look up the factory for `type_name`.
    pub fn get(&self, type_name: &str) -> Option<Arc<dyn PluginFactory>> {
        self.factories.get(type_name).cloned()
    }

    /// Whether `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered plugin types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no plugin types are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("types", &self.names())
            .finish()
    }
}

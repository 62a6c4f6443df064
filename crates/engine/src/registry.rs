// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module registry: type name to constructor

use crate::error::ConfigError;
use evs_config::{ModuleDef, ProcessConfig};
use evs_core::{Module, ModuleError};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Builds a module from its configuration.
pub type ModuleFactory = Box<dyn Fn(&ModuleDef) -> Result<Module, ModuleError> + Send + Sync>;

/// Known module types.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: BTreeMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        factory: impl Fn(&ModuleDef) -> Result<Module, ModuleError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.factories.insert(type_name.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(&self, def: &ModuleDef) -> Result<Module, ConfigError> {
        let factory = self
            .factories
            .get(&def.type_name)
            .ok_or_else(|| ConfigError::UnknownModuleType {
                label: def.label.clone(),
                type_name: def.type_name.clone(),
                known: self.type_names().join(", "),
            })?;
        factory(def).map_err(|source| ConfigError::Construction {
            label: def.label.clone(),
            source,
        })
    }

    /// Instantiate every module of a configuration, keyed by label.
    pub fn instantiate(
        &self,
        config: &ProcessConfig,
    ) -> Result<IndexMap<String, Module>, ConfigError> {
        let mut modules = IndexMap::new();
        for (label, def) in &config.modules {
            modules.insert(label.clone(), self.create(def)?);
        }
        Ok(modules)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

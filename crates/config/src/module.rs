// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module definitions

use evs_core::ModuleKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A configured module instance.
///
/// Keys other than the ones below are module parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDef {
    /// Set from the table key during parsing
    #[serde(skip)]
    pub label: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Declared kind, checked against the instantiated module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModuleKind>,
    /// Output modules only: trigger paths whose acceptance selects an event.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_events: Vec<String>,
    /// Output modules only: event limit for this module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_events: Option<u64>,
    #[serde(flatten)]
    pub params: toml::Table,
}

impl ModuleDef {
    pub fn new(label: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            type_name: type_name.into(),
            kind: None,
            select_events: Vec::new(),
            max_events: None,
            params: toml::Table::new(),
        }
    }

    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_param(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(toml::Value::as_integer)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(toml::Value::as_bool)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(toml::Value::as_str)
    }

    /// A list of strings; non-string items are skipped.
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.params
            .get(key)
            .and_then(toml::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stable hash of the definition, used as the configuration id.
    pub fn config_id(&self) -> String {
        let canonical = serde_json::to_value(self)
            .and_then(|json| serde_json::to_string(&json))
            .unwrap_or_default();
        let digest = Sha256::digest(format!("{}|{}", self.label, canonical).as_bytes());
        format!("{:x}", digest)
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration parsing (TOML and JSON)

use crate::module::ModuleDef;
use crate::options::{MaxEvents, Options};
use crate::path::PathEntry;
use crate::validate::validate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Guess from the file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// Errors that can occur during configuration parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid format for {location}: {message}")]
    InvalidFormat { location: String, message: String },
}

fn default_process_name() -> String {
    "PROCESS".to_string()
}

/// A parsed process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default = "default_process_name")]
    pub process: String,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub max_events: MaxEvents,
    #[serde(default, alias = "module")]
    pub modules: IndexMap<String, ModuleDef>,
    /// Trigger paths in bit order
    #[serde(default, alias = "path")]
    pub paths: IndexMap<String, Vec<String>>,
    /// End paths in bit order
    #[serde(default, alias = "end_path")]
    pub end_paths: IndexMap<String, Vec<String>>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            process: default_process_name(),
            options: Options::default(),
            max_events: MaxEvents::default(),
            modules: IndexMap::new(),
            paths: IndexMap::new(),
            end_paths: IndexMap::new(),
        }
    }
}

impl ProcessConfig {
    pub fn get_module(&self, label: &str) -> Option<&ModuleDef> {
        self.modules.get(label)
    }

    /// Trigger paths with parsed entries, in bit order.
    pub fn trigger_paths(&self) -> Vec<(String, Vec<PathEntry>)> {
        parse_paths(&self.paths)
    }

    /// End paths with parsed entries, in bit order.
    pub fn end_path_entries(&self) -> Vec<(String, Vec<PathEntry>)> {
        parse_paths(&self.end_paths)
    }

    /// Add a module definition, keyed by its label.
    pub fn add_module(&mut self, def: ModuleDef) -> &mut Self {
        self.modules.insert(def.label.clone(), def);
        self
    }

    pub fn add_path(&mut self, name: &str, entries: &[&str]) -> &mut Self {
        let entries = entries.iter().map(|e| e.to_string()).collect();
        self.paths.insert(name.to_string(), entries);
        self
    }

    pub fn add_end_path(&mut self, name: &str, entries: &[&str]) -> &mut Self {
        let entries = entries.iter().map(|e| e.to_string()).collect();
        self.end_paths.insert(name.to_string(), entries);
        self
    }
}

fn parse_paths(paths: &IndexMap<String, Vec<String>>) -> Vec<(String, Vec<PathEntry>)> {
    paths
        .iter()
        .map(|(name, entries)| {
            (
                name.clone(),
                entries.iter().map(|e| PathEntry::parse(e)).collect(),
            )
        })
        .collect()
}

/// Parse a process configuration from TOML content
pub fn parse_config(content: &str) -> Result<ProcessConfig, ParseError> {
    parse_config_with_format(content, Format::Toml)
}

/// Parse a process configuration in the specified format
pub fn parse_config_with_format(
    content: &str,
    format: Format,
) -> Result<ProcessConfig, ParseError> {
    // 1. Serde does the heavy lifting
    let mut config: ProcessConfig = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };

    // 2. Label fixup: inject map keys into module labels
    for (label, def) in &mut config.modules {
        def.label = label.clone();
    }

    // 3. Structural validation
    validate(&config)?;

    tracing::debug!(
        process = %config.process,
        modules = config.modules.len(),
        paths = config.paths.len(),
        end_paths = config.end_paths.len(),
        "parsed process configuration"
    );
    Ok(config)
}

/// Read and parse a configuration file, picking the format from its extension
pub fn load_config(path: &Path) -> Result<ProcessConfig, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config_with_format(&content, Format::from_path(path))
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;

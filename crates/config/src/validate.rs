// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural validation of a parsed configuration
//!
//! Checks that need instantiated modules (kinds, output limits per output
//! module) happen when the schedule is assembled.

use crate::parser::{ParseError, ProcessConfig};
use crate::path::PathEntry;
use std::collections::HashSet;

fn invalid(location: String, message: impl Into<String>) -> ParseError {
    ParseError::InvalidFormat {
        location,
        message: message.into(),
    }
}

/// Sorted keys for stable error messages.
pub(crate) fn sorted_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    let mut names: Vec<&str> = names.map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

pub(crate) fn validate(config: &ProcessConfig) -> Result<(), ParseError> {
    for (label, def) in &config.modules {
        if label.trim().is_empty() {
            return Err(invalid("module".to_string(), "module label is empty"));
        }
        if def.type_name.trim().is_empty() {
            return Err(invalid(format!("module.{}.type", label), "module type is empty"));
        }
    }

    let mut seen = HashSet::new();
    for (kind, paths) in [("path", &config.paths), ("end_path", &config.end_paths)] {
        for (name, entries) in paths {
            if !seen.insert(name.as_str()) {
                return Err(invalid(
                    format!("{}.{}", kind, name),
                    "path name is used more than once",
                ));
            }
            for (i, raw) in entries.iter().enumerate() {
                let entry = PathEntry::parse(raw);
                if entry.label.is_empty() {
                    return Err(invalid(
                        format!("{}.{}[{}]", kind, name, i),
                        "entry has no module label",
                    ));
                }
            }
        }
    }

    for (label, def) in &config.modules {
        for path in &def.select_events {
            if !config.paths.contains_key(path) {
                return Err(invalid(
                    format!("module.{}.select_events", label),
                    format!(
                        "unknown trigger path '{}' (known: {})",
                        path,
                        sorted_names(config.paths.keys())
                    ),
                ));
            }
        }
    }

    Ok(())
}

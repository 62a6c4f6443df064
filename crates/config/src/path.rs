// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path entries: a module label with an optional filter action prefix

use serde::{Deserialize, Serialize};

/// How a path uses a filter's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    /// The decision is used as is.
    #[default]
    Normal,
    /// The decision is inverted (`!label`).
    Veto,
    /// The module runs but its decision is ignored (`-label`).
    Ignore,
}

impl FilterAction {
    /// Apply the action to a raw decision.
    pub fn apply(self, raw: bool) -> bool {
        match self {
            FilterAction::Normal => raw,
            FilterAction::Veto => !raw,
            FilterAction::Ignore => true,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            FilterAction::Normal => "",
            FilterAction::Veto => "!",
            FilterAction::Ignore => "-",
        }
    }
}

/// One entry of a path as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub label: String,
    pub action: FilterAction,
}

impl PathEntry {
    pub fn new(label: impl Into<String>, action: FilterAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }

    /// Parse `label`, `!label` or `-label`.
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();
        if let Some(label) = entry.strip_prefix('!') {
            Self::new(label.trim(), FilterAction::Veto)
        } else if let Some(label) = entry.strip_prefix('-') {
            Self::new(label.trim(), FilterAction::Ignore)
        } else {
            Self::new(entry, FilterAction::Normal)
        }
    }
}

impl std::fmt::Display for PathEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.action.prefix(), self.label)
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;

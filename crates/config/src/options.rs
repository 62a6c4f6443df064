// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide options and event limits

use evs_core::{FileMode, MachineConfig};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Scheduling and job policy options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Run producers and filters that are on no path when their products
    /// are requested.
    pub allow_unscheduled: bool,
    /// Log the trigger report at end of job.
    pub want_summary: bool,
    /// Module types allowed to act as filters on end paths.
    #[serde(alias = "@filters_on_endpaths")]
    pub filters_on_endpaths: Vec<String>,
    pub file_mode: FileMode,
    pub handle_empty_runs: bool,
    pub handle_empty_lumis: bool,
}

impl Options {
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            file_mode: self.file_mode,
            handle_empty_runs: self.handle_empty_runs,
            handle_empty_lumis: self.handle_empty_lumis,
        }
    }
}

/// Output event limit: one value for every output module, or one per label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputLimit {
    All(u64),
    PerModule(IndexMap<String, u64>),
}

/// Event limits. Absent means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxEvents {
    pub input: Option<u64>,
    pub output: Option<OutputLimit>,
}

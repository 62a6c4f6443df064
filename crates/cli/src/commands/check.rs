// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `evs check <config>` - validate a configuration and assemble its schedule

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use evs_config::{load_config, ProcessConfig};
use evs_core::{ModuleKind, SystemClock};
use evs_engine::Schedule;
use serde::Serialize;

use crate::exit_error::{self, ExitError};
use crate::modules;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Process configuration file (.toml or .json)
    pub config: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckSummary {
    pub process: String,
    pub trigger_paths: Vec<String>,
    pub end_paths: Vec<String>,
    pub modules: Vec<ModuleLine>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModuleLine {
    pub label: String,
    pub type_name: String,
    pub kind: ModuleKind,
}

impl CheckSummary {
    pub(crate) fn of<C: evs_core::Clock>(schedule: &Schedule<C>) -> Self {
        Self {
            process: schedule.process_name().to_string(),
            trigger_paths: schedule
                .trigger_names()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            end_paths: schedule
                .end_path_names()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            modules: schedule
                .module_descriptions()
                .into_iter()
                .map(|d| ModuleLine {
                    label: d.label.to_string(),
                    type_name: d.type_name,
                    kind: d.kind,
                })
                .collect(),
        }
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "process {}: {} module(s), {} path(s), {} end path(s)",
            self.process,
            self.modules.len(),
            self.trigger_paths.len(),
            self.end_paths.len()
        )?;
        for m in &self.modules {
            writeln!(
                f,
                "  {:<10} {:<20} {}",
                m.kind.as_str(),
                m.label,
                m.type_name
            )?;
        }
        Ok(())
    }
}

pub fn handle(args: CheckArgs, format: OutputFormat) -> Result<()> {
    let config = load(&args.config)?;
    let modules = modules::registry()
        .instantiate(&config)
        .map_err(config_error)?;
    let schedule = Schedule::new(&config, modules, vec![], SystemClock).map_err(config_error)?;
    output::print(&CheckSummary::of(&schedule), format)
}

pub(crate) fn load(path: &Path) -> Result<ProcessConfig> {
    Ok(load_config(path).map_err(config_error)?)
}

pub(crate) fn config_error(err: impl fmt::Display) -> ExitError {
    ExitError::new(exit_error::CONFIG, err.to_string())
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;

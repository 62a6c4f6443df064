// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduling engine

use evs_core::{ModuleError, ModuleKind, ModuleLabel, PathName};
use thiserror::Error;

/// How a module call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The module returned an error.
    Raised(ModuleError),
    /// The module panicked. Carries the panic message.
    Panicked(String),
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Raised(err) => write!(f, "{}", err),
            Failure::Panicked(msg) => write!(f, "[Panic] {}", msg),
        }
    }
}

/// A module failure annotated with the module's identity and the stage it
/// was in. Cloned when a memoized failure is replayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("module '{label}' ({type_name}) failed during {stage}: {failure}")]
pub struct WorkerError {
    pub label: ModuleLabel,
    pub type_name: String,
    pub stage: &'static str,
    pub failure: Failure,
}

impl WorkerError {
    pub fn category(&self) -> &str {
        match &self.failure {
            Failure::Raised(err) => &err.category,
            Failure::Panicked(_) => "Panic",
        }
    }

    /// Convert back into a module error, e.g. for a module whose on-demand
    /// dependency failed.
    pub fn to_module_error(&self) -> ModuleError {
        ModuleError::new(self.category(), self.to_string())
    }
}

/// A worker failure on a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path '{path}': {source}")]
pub struct PathError {
    pub path: PathName,
    #[source]
    pub source: WorkerError,
}

/// Errors detected while assembling a schedule. All are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown module '{label}' on {} '{path}'", path_kind(.end_path))]
    UnknownLabel {
        label: String,
        path: String,
        end_path: bool,
    },
    #[error("module '{label}' is declared as {declared} but is a {actual}")]
    KindMismatch {
        label: String,
        declared: ModuleKind,
        actual: ModuleKind,
    },
    #[error("output module '{label}' is on trigger path '{path}'; it belongs on an end path")]
    OutputOnTriggerPath { label: String, path: String },
    #[error("max_events.output cannot be combined with per-module max_events (set on '{label}')")]
    OutputLimitConflict { label: String },
    #[error("max_events.output has no entry for output module '{label}'")]
    MissingOutputLimit { label: String },
    #[error("invalid output limit for '{label}': {reason}")]
    InvalidOutputLimit { label: String, reason: String },
    #[error("module '{label}' selects events from unknown trigger path '{path}'")]
    UnknownSelectPath { label: String, path: String },
    #[error("label '{label}' is reserved")]
    ReservedLabel { label: String },
    #[error("no module instance for configured label '{label}'")]
    MissingModule { label: String },
    #[error("module instance '{label}' has no configuration")]
    UnconfiguredModule { label: String },
    #[error("unknown module type '{type_name}' for '{label}' (known: {known})")]
    UnknownModuleType {
        label: String,
        type_name: String,
        known: String,
    },
    #[error("failed to construct module '{label}': {source}")]
    Construction {
        label: String,
        #[source]
        source: ModuleError,
    },
}

/// Errors from schedule operations.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("end job failed for {} module(s): {}", failures.len(), join_errors(failures))]
    EndJob { failures: Vec<WorkerError> },
}

fn path_kind(end_path: &bool) -> &'static str {
    if *end_path {
        "end path"
    } else {
        "path"
    }
}

fn join_errors(errors: &[WorkerError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ScheduleError {
    /// The module that failed, when a single one did.
    pub fn module(&self) -> Option<&ModuleLabel> {
        match self {
            ScheduleError::Path(err) => Some(&err.source.label),
            ScheduleError::Worker(err) => Some(&err.label),
            ScheduleError::EndJob { failures } if failures.len() == 1 => {
                failures.first().map(|e| &e.label)
            }
            _ => None,
        }
    }

    /// The path the failure happened on, if any.
    pub fn path(&self) -> Option<&PathName> {
        match self {
            ScheduleError::Path(err) => Some(&err.path),
            _ => None,
        }
    }
}

/// Errors from the input source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid input script at item {position}: {message}")]
    Script { position: usize, message: String },
    #[error("no {0} available at this point of the input")]
    NoRecord(&'static str),
    #[error("input error: {0}")]
    Other(String),
}

/// Errors from the event processor.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("job protocol violation: {event} is not accepted in state {state}")]
    Protocol { state: String, event: String },
    #[error("looper failed: {0}")]
    Looper(ModuleError),
    #[error("no cached {0} record")]
    MissingRecord(String),
}

impl ProcessError {
    pub fn module(&self) -> Option<&ModuleLabel> {
        match self {
            ProcessError::Schedule(err) => err.module(),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&PathName> {
        match self {
            ProcessError::Schedule(err) => err.path(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

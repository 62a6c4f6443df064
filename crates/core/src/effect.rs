// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects the job machine asks the driving loop to perform

use crate::id::{LumiNumber, RunNumber};
use serde::{Deserialize, Serialize};

/// Side effects returned by [`crate::JobMachine::process`], executed in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    // === Loop effects ===
    /// Notify the looper and modules that a pass over the input begins
    StartingNewLoop,
    /// The pass is over; ask the looper whether to run another
    EndOfLoop,
    PrepareForNextLoop,
    RewindInput,

    // === File effects ===
    /// Read the next input file and notify modules
    OpenInputFile,
    CloseInputFile,
    /// Open output files and notify modules
    OpenOutputFiles,
    CloseOutputFiles,

    // === Run effects ===
    /// Read the run record and cache it
    CacheRun { run: RunNumber },
    /// Read a continuation of an open run and fold it into the cached record
    MergeRun { run: RunNumber },
    BeginRun { run: RunNumber },
    EndRun { run: RunNumber },
    WriteRun { run: RunNumber },
    DeleteRun { run: RunNumber },

    // === Lumi effects ===
    CacheLumi { run: RunNumber, lumi: LumiNumber },
    MergeLumi { run: RunNumber, lumi: LumiNumber },
    BeginLumi { run: RunNumber, lumi: LumiNumber },
    EndLumi { run: RunNumber, lumi: LumiNumber },
    WriteLumi { run: RunNumber, lumi: LumiNumber },
    DeleteLumi { run: RunNumber, lumi: LumiNumber },

    // === Event effects ===
    /// Read the next event and run the schedule on it
    ProcessEvent,

    // === Errors ===
    /// An event arrived that the state does not accept
    ProtocolError { state: String, event: String },
}

impl Effect {
    /// Short name for log records.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::StartingNewLoop => "starting_new_loop",
            Effect::EndOfLoop => "end_of_loop",
            Effect::PrepareForNextLoop => "prepare_for_next_loop",
            Effect::RewindInput => "rewind_input",
            Effect::OpenInputFile => "open_input_file",
            Effect::CloseInputFile => "close_input_file",
            Effect::OpenOutputFiles => "open_output_files",
            Effect::CloseOutputFiles => "close_output_files",
            Effect::CacheRun { .. } => "cache_run",
            Effect::MergeRun { .. } => "merge_run",
            Effect::BeginRun { .. } => "begin_run",
            Effect::EndRun { .. } => "end_run",
            Effect::WriteRun { .. } => "write_run",
            Effect::DeleteRun { .. } => "delete_run",
            Effect::CacheLumi { .. } => "cache_lumi",
            Effect::MergeLumi { .. } => "merge_lumi",
            Effect::BeginLumi { .. } => "begin_lumi",
            Effect::EndLumi { .. } => "end_lumi",
            Effect::WriteLumi { .. } => "write_lumi",
            Effect::DeleteLumi { .. } => "delete_lumi",
            Effect::ProcessEvent => "process_event",
            Effect::ProtocolError { .. } => "protocol_error",
        }
    }

    /// Structured fields for log records.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::CacheRun { run }
            | Effect::MergeRun { run }
            | Effect::BeginRun { run }
            | Effect::EndRun { run }
            | Effect::WriteRun { run }
            | Effect::DeleteRun { run } => vec![("run", run.to_string())],
            Effect::CacheLumi { run, lumi }
            | Effect::MergeLumi { run, lumi }
            | Effect::BeginLumi { run, lumi }
            | Effect::EndLumi { run, lumi }
            | Effect::WriteLumi { run, lumi }
            | Effect::DeleteLumi { run, lumi } => {
                vec![("run", run.to_string()), ("lumi", lumi.to_string())]
            }
            Effect::ProtocolError { state, event } => {
                vec![("state", state.clone()), ("event", event.clone())]
            }
            _ => vec![],
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;

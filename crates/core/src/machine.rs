// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job phase state machine
//!
//! [`JobMachine::process`] is a pure transition: it takes the next item
//! reported by the input and returns the effects the driving loop must run,
//! in order. It never touches modules or records itself.
//!
//! Begin-run and begin-lumi fire lazily, right before the first event that
//! needs them. Empty runs and lumis only get begin/end calls when the
//! configuration asks for it; their records are always written.

use crate::effect::Effect;
use crate::id::{LumiNumber, RunNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How runs and lumis are merged across input file boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    /// Every file boundary closes all runs and lumis and reopens outputs.
    NoMerge,
    /// A run or lumi continuing directly into the next file stays open.
    #[default]
    Merge,
    /// As `Merge`, and lumis stay open until their run ends, so a lumi seen
    /// again in the same run rejoins its earlier fragments.
    FullLumiMerge,
    /// As `FullLumiMerge`, and runs stay open until the job stops.
    FullMerge,
}

impl FileMode {
    fn merges_across_files(self) -> bool {
        self != FileMode::NoMerge
    }

    fn keeps_lumis_open(self) -> bool {
        matches!(self, FileMode::FullLumiMerge | FileMode::FullMerge)
    }

    fn keeps_runs_open(self) -> bool {
        self == FileMode::FullMerge
    }
}

/// Job machine policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub file_mode: FileMode,
    #[serde(default)]
    pub handle_empty_runs: bool,
    #[serde(default)]
    pub handle_empty_lumis: bool,
}

/// Items fed into the machine by the driving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEvent {
    File,
    Run(RunNumber),
    Lumi(LumiNumber),
    Event,
    Stop,
    Restart,
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobEvent::File => f.write_str("File"),
            JobEvent::Run(run) => write!(f, "Run({})", run),
            JobEvent::Lumi(lumi) => write!(f, "Lumi({})", lumi),
            JobEvent::Event => f.write_str("Event"),
            JobEvent::Stop => f.write_str("Stop"),
            JobEvent::Restart => f.write_str("Restart"),
        }
    }
}

/// Top level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Starting,
    HandleFiles(FileState),
    EndingLoop,
    Error,
    Terminated,
}

/// Sub-state while input files are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    FirstFile,
    /// The input file was replaced, no run is open.
    HandleNewInputFile,
    /// Input and output files were replaced, no run is open.
    NewInputAndOutputFiles,
    HandleRuns(RunState),
}

/// Sub-state while a run is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NewRun,
    /// The open run continued from the previous file.
    ContinueRun,
    /// The input file was replaced while the run was open.
    HandleNewInputFile,
    HandleLumis(LumiState),
}

/// Sub-state while a lumi is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LumiState {
    FirstLumi,
    AnotherLumi,
    /// The open lumi continued from the previous file.
    ContinueLumi,
    HandleEvent,
    /// The input file was replaced while the lumi was open.
    HandleNewInputFile,
    /// The run continued into the new file; the lumi may continue too.
    ContinueRun,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Starting => f.write_str("Starting"),
            JobState::EndingLoop => f.write_str("EndingLoop"),
            JobState::Error => f.write_str("Error"),
            JobState::Terminated => f.write_str("Terminated"),
            JobState::HandleFiles(files) => {
                f.write_str("HandleFiles/")?;
                match files {
                    FileState::FirstFile => f.write_str("FirstFile"),
                    FileState::HandleNewInputFile => f.write_str("HandleNewInputFile"),
                    FileState::NewInputAndOutputFiles => f.write_str("NewInputAndOutputFiles"),
                    FileState::HandleRuns(runs) => {
                        f.write_str("HandleRuns/")?;
                        match runs {
                            RunState::NewRun => f.write_str("NewRun"),
                            RunState::ContinueRun => f.write_str("ContinueRun"),
                            RunState::HandleNewInputFile => f.write_str("HandleNewInputFile"),
                            RunState::HandleLumis(lumis) => write!(f, "HandleLumis/{:?}", lumis),
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LumiEntry {
    begun: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RunEntry {
    begun: bool,
    lumis: BTreeMap<LumiNumber, LumiEntry>,
    /// Empty lumis finalized before the run began, awaiting begin-run.
    unhandled: Vec<LumiNumber>,
}

/// Drives the job phases. See the module docs.
#[derive(Debug, Clone)]
pub struct JobMachine {
    config: MachineConfig,
    state: JobState,
    runs: BTreeMap<RunNumber, RunEntry>,
    current_run: Option<RunNumber>,
    current_lumi: Option<LumiNumber>,
}

impl JobMachine {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            state: JobState::Starting,
            runs: BTreeMap::new(),
            current_run: None,
            current_lumi: None,
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == JobState::Terminated
    }

    pub fn current_run(&self) -> Option<RunNumber> {
        self.current_run
    }

    pub fn current_lumi(&self) -> Option<LumiNumber> {
        self.current_lumi
    }

    /// Runs not yet finalized, ascending.
    pub fn open_runs(&self) -> Vec<RunNumber> {
        self.runs.keys().copied().collect()
    }

    /// Apply one event and return the effects to execute.
    pub fn process(&mut self, event: JobEvent) -> Vec<Effect> {
        let mut fx = Vec::new();
        let next = self.transition(event, &mut fx);
        tracing::debug!(
            from = %self.state,
            to = %next,
            event = %event,
            effects = fx.len(),
            "job transition"
        );
        self.state = next;
        fx
    }

    /// Enter `Error` without finalizing anything. Used when a module error
    /// is already propagating and no further module calls should be made.
    pub fn abort(&mut self) {
        self.runs.clear();
        self.current_run = None;
        self.current_lumi = None;
        if !matches!(self.state, JobState::Terminated) {
            self.state = JobState::Error;
        }
    }

    fn transition(&mut self, event: JobEvent, fx: &mut Vec<Effect>) -> JobState {
        match (self.state, event) {
            (JobState::Terminated, _) => JobState::Terminated,

            (JobState::Starting, JobEvent::File) => {
                fx.push(Effect::StartingNewLoop);
                fx.push(Effect::OpenInputFile);
                fx.push(Effect::OpenOutputFiles);
                JobState::HandleFiles(FileState::FirstFile)
            }
            (JobState::Starting, JobEvent::Stop) => JobState::Terminated,
            (JobState::Starting, _) => self.protocol_error(event, fx),

            (JobState::EndingLoop, JobEvent::Stop) => JobState::Terminated,
            (JobState::EndingLoop, JobEvent::Restart) => {
                fx.push(Effect::PrepareForNextLoop);
                fx.push(Effect::RewindInput);
                JobState::Starting
            }
            (JobState::EndingLoop, _) => self.protocol_error(event, fx),

            (JobState::Error, JobEvent::Stop) => {
                fx.push(Effect::EndOfLoop);
                JobState::EndingLoop
            }
            (JobState::Error, _) => JobState::Error,

            (JobState::HandleFiles(files), _) => self.handle_files(files, event, fx),
        }
    }

    fn handle_files(
        &mut self,
        files: FileState,
        event: JobEvent,
        fx: &mut Vec<Effect>,
    ) -> JobState {
        use FileState::*;
        use LumiState as L;
        use RunState as R;

        let next = match (files, event) {
            (_, JobEvent::Stop) => {
                self.finalize_all(fx);
                fx.push(Effect::CloseInputFile);
                fx.push(Effect::CloseOutputFiles);
                fx.push(Effect::EndOfLoop);
                return JobState::EndingLoop;
            }
            (_, JobEvent::Restart) => return self.protocol_error(event, fx),

            (_, JobEvent::File) => self.new_file(files, fx),

            (FirstFile | HandleNewInputFile | NewInputAndOutputFiles, JobEvent::Run(run)) => {
                HandleRuns(self.enter_run(run, false, fx))
            }
            (HandleRuns(R::HandleNewInputFile), JobEvent::Run(run)) => {
                HandleRuns(self.enter_run(run, true, fx))
            }
            (HandleRuns(R::HandleLumis(L::HandleNewInputFile)), JobEvent::Run(run)) => {
                HandleRuns(self.enter_run(run, true, fx))
            }
            (HandleRuns(_), JobEvent::Run(run)) => HandleRuns(self.enter_run(run, false, fx)),

            (HandleRuns(R::NewRun | R::ContinueRun), JobEvent::Lumi(lumi)) => {
                HandleRuns(R::HandleLumis(self.enter_lumi(lumi, false, fx)))
            }
            (HandleRuns(R::HandleLumis(L::ContinueRun)), JobEvent::Lumi(lumi)) => {
                HandleRuns(R::HandleLumis(self.enter_lumi(lumi, true, fx)))
            }
            (
                HandleRuns(R::HandleLumis(
                    L::FirstLumi | L::AnotherLumi | L::ContinueLumi | L::HandleEvent,
                )),
                JobEvent::Lumi(lumi),
            ) => HandleRuns(R::HandleLumis(self.enter_lumi(lumi, false, fx))),

            (
                HandleRuns(R::HandleLumis(
                    L::FirstLumi | L::AnotherLumi | L::ContinueLumi | L::HandleEvent,
                )),
                JobEvent::Event,
            ) => {
                self.begin_for_event(fx);
                fx.push(Effect::ProcessEvent);
                HandleRuns(R::HandleLumis(L::HandleEvent))
            }

            _ => return self.protocol_error(event, fx),
        };
        JobState::HandleFiles(next)
    }

    fn new_file(&mut self, files: FileState, fx: &mut Vec<Effect>) -> FileState {
        if !self.config.file_mode.merges_across_files() {
            self.finalize_all(fx);
            fx.push(Effect::CloseInputFile);
            fx.push(Effect::CloseOutputFiles);
            fx.push(Effect::OpenInputFile);
            fx.push(Effect::OpenOutputFiles);
            return FileState::NewInputAndOutputFiles;
        }

        fx.push(Effect::CloseInputFile);
        fx.push(Effect::OpenInputFile);
        match files {
            FileState::HandleRuns(RunState::HandleLumis(_)) if self.current_lumi.is_some() => {
                FileState::HandleRuns(RunState::HandleLumis(LumiState::HandleNewInputFile))
            }
            FileState::HandleRuns(_) if self.current_run.is_some() => {
                FileState::HandleRuns(RunState::HandleNewInputFile)
            }
            _ => FileState::HandleNewInputFile,
        }
    }

    /// Handle a run item. `after_file` is true when it directly follows a
    /// new input file, so a matching open run is a continuation.
    fn enter_run(&mut self, run: RunNumber, after_file: bool, fx: &mut Vec<Effect>) -> RunState {
        let mode = self.config.file_mode;
        let lumi_open = self.current_lumi.is_some();

        if let Some(current) = self.current_run {
            if current == run && (after_file || mode.keeps_runs_open()) {
                fx.push(Effect::MergeRun { run });
                return if after_file && lumi_open {
                    RunState::HandleLumis(LumiState::ContinueRun)
                } else {
                    self.current_lumi = None;
                    RunState::ContinueRun
                };
            }
            if mode.keeps_runs_open() {
                self.current_run = None;
                self.current_lumi = None;
            } else {
                self.finalize_run(current, fx);
            }
        }

        self.current_run = Some(run);
        self.current_lumi = None;
        if self.runs.contains_key(&run) {
            fx.push(Effect::MergeRun { run });
            RunState::ContinueRun
        } else {
            self.runs.insert(run, RunEntry::default());
            fx.push(Effect::CacheRun { run });
            RunState::NewRun
        }
    }

    /// Handle a lumi item. `after_run_continued` is true when the run just
    /// continued from the previous file, so a matching open lumi continues.
    fn enter_lumi(
        &mut self,
        lumi: LumiNumber,
        after_run_continued: bool,
        fx: &mut Vec<Effect>,
    ) -> LumiState {
        let Some(run) = self.current_run else {
            return LumiState::FirstLumi;
        };
        let keep_open = self.config.file_mode.keeps_lumis_open();
        let previous = self.current_lumi;

        if let Some(current) = previous {
            if current == lumi && (after_run_continued || keep_open) {
                fx.push(Effect::MergeLumi { run, lumi });
                return LumiState::ContinueLumi;
            }
            if !keep_open {
                self.finalize_lumi(run, current, fx);
            }
        }

        self.current_lumi = Some(lumi);
        let entry = self.runs.entry(run).or_default();
        if entry.lumis.contains_key(&lumi) {
            fx.push(Effect::MergeLumi { run, lumi });
            return LumiState::ContinueLumi;
        }
        entry.lumis.insert(lumi, LumiEntry::default());
        fx.push(Effect::CacheLumi { run, lumi });
        if previous.is_some() {
            LumiState::AnotherLumi
        } else {
            LumiState::FirstLumi
        }
    }

    fn begin_for_event(&mut self, fx: &mut Vec<Effect>) {
        let (Some(run), Some(lumi)) = (self.current_run, self.current_lumi) else {
            return;
        };
        self.begin_run_if_needed(run, fx);
        if let Some(entry) = self.runs.get_mut(&run).and_then(|r| r.lumis.get_mut(&lumi)) {
            if !entry.begun {
                entry.begun = true;
                fx.push(Effect::BeginLumi { run, lumi });
            }
        }
    }

    fn begin_run_if_needed(&mut self, run: RunNumber, fx: &mut Vec<Effect>) {
        let Some(entry) = self.runs.get_mut(&run) else {
            return;
        };
        if entry.begun {
            return;
        }
        entry.begun = true;
        fx.push(Effect::BeginRun { run });
        for lumi in std::mem::take(&mut entry.unhandled) {
            fx.push(Effect::BeginLumi { run, lumi });
            fx.push(Effect::EndLumi { run, lumi });
            fx.push(Effect::WriteLumi { run, lumi });
            fx.push(Effect::DeleteLumi { run, lumi });
        }
    }

    fn finalize_lumi(&mut self, run: RunNumber, lumi: LumiNumber, fx: &mut Vec<Effect>) {
        if self.current_run == Some(run) && self.current_lumi == Some(lumi) {
            self.current_lumi = None;
        }
        let handle_empty = self.config.handle_empty_lumis;
        let Some(entry) = self.runs.get_mut(&run) else {
            return;
        };
        let Some(state) = entry.lumis.remove(&lumi) else {
            return;
        };
        if state.begun {
            fx.push(Effect::EndLumi { run, lumi });
        } else if handle_empty {
            if !entry.begun {
                entry.unhandled.push(lumi);
                return;
            }
            fx.push(Effect::BeginLumi { run, lumi });
            fx.push(Effect::EndLumi { run, lumi });
        }
        fx.push(Effect::WriteLumi { run, lumi });
        fx.push(Effect::DeleteLumi { run, lumi });
    }

    fn finalize_run(&mut self, run: RunNumber, fx: &mut Vec<Effect>) {
        let lumis: Vec<LumiNumber> = self
            .runs
            .get(&run)
            .map(|entry| entry.lumis.keys().copied().collect())
            .unwrap_or_default();
        for lumi in lumis {
            self.finalize_lumi(run, lumi, fx);
        }

        if self.config.handle_empty_runs {
            self.begin_run_if_needed(run, fx);
        }

        if self.current_run == Some(run) {
            self.current_run = None;
            self.current_lumi = None;
        }
        let Some(entry) = self.runs.remove(&run) else {
            return;
        };
        for lumi in entry.unhandled {
            fx.push(Effect::WriteLumi { run, lumi });
            fx.push(Effect::DeleteLumi { run, lumi });
        }
        if entry.begun {
            fx.push(Effect::EndRun { run });
        }
        fx.push(Effect::WriteRun { run });
        fx.push(Effect::DeleteRun { run });
    }

    fn finalize_all(&mut self, fx: &mut Vec<Effect>) {
        let runs: Vec<RunNumber> = self.runs.keys().copied().collect();
        for run in runs {
            self.finalize_run(run, fx);
        }
    }

    fn protocol_error(&mut self, event: JobEvent, fx: &mut Vec<Effect>) -> JobState {
        let state = self.state.to_string();
        tracing::error!(%state, %event, "unexpected job event");
        if matches!(self.state, JobState::HandleFiles(_)) {
            self.finalize_all(fx);
            fx.push(Effect::CloseInputFile);
            fx.push(Effect::CloseOutputFiles);
        }
        fx.push(Effect::ProtocolError {
            state,
            event: event.to_string(),
        });
        JobState::Error
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;

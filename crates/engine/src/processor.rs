// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event processor: drives the job machine from an input source
//!
//! Each input item becomes a [`JobEvent`]; the effects the machine returns
//! are executed against the schedule, the source and the looper.

use crate::error::ProcessError;
use crate::looper::Looper;
use crate::observer::Observer;
use crate::registry::ModuleRegistry;
use crate::schedule::Schedule;
use crate::source::{InputSource, ItemType};
use evs_config::ProcessConfig;
use evs_core::{
    Clock, Conditions, Effect, FileBlock, JobEvent, JobMachine, JobState, LumiNumber,
    LumiPrincipal, MachineConfig, RunNumber, RunPrincipal, SystemClock,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How a run call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The job machine reached its terminal state.
    Success,
    /// The requested number of events was processed; the job can resume.
    CountComplete,
}

/// Owns a schedule and runs it over an input source.
pub struct EventProcessor<C: Clock = SystemClock> {
    schedule: Schedule<C>,
    source: Box<dyn InputSource>,
    looper: Option<Box<dyn Looper>>,
    conditions: Conditions,
    machine: JobMachine,
    max_events: Option<u64>,
    events_read: u64,
    pass_events: u64,
    iteration: u32,
    file: Option<FileBlock>,
    runs: BTreeMap<RunNumber, RunPrincipal>,
    lumis: BTreeMap<(RunNumber, LumiNumber), LumiPrincipal>,
    pending_run: Option<RunPrincipal>,
    pending_lumi: Option<LumiPrincipal>,
    queued: Option<JobEvent>,
    stop_requested: bool,
    protocol_error: Option<(String, String)>,
    job_begun: bool,
    job_ended: bool,
}

impl EventProcessor<SystemClock> {
    /// Build a processor from a configuration and the registered module types.
    pub fn from_config(
        config: &ProcessConfig,
        registry: &ModuleRegistry,
        source: Box<dyn InputSource>,
        observers: Vec<Arc<dyn Observer>>,
    ) -> Result<Self, ProcessError> {
        let modules = registry.instantiate(config)?;
        let schedule = Schedule::new(config, modules, observers, SystemClock)?;
        Ok(Self::new(schedule, source, config.options.machine_config())
            .with_max_events(config.max_events.input))
    }
}

impl<C: Clock> EventProcessor<C> {
    pub fn new(schedule: Schedule<C>, source: Box<dyn InputSource>, config: MachineConfig) -> Self {
        Self {
            schedule,
            source,
            looper: None,
            conditions: Conditions::none(),
            machine: JobMachine::new(config),
            max_events: None,
            events_read: 0,
            pass_events: 0,
            iteration: 0,
            file: None,
            runs: BTreeMap::new(),
            lumis: BTreeMap::new(),
            pending_run: None,
            pending_lumi: None,
            queued: None,
            stop_requested: false,
            protocol_error: None,
            job_begun: false,
            job_ended: false,
        }
    }

    pub fn with_looper(mut self, looper: Box<dyn Looper>) -> Self {
        self.looper = Some(looper);
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Stop each pass over the input after this many events. `None` reads
    /// everything.
    pub fn with_max_events(mut self, max_events: Option<u64>) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn schedule(&self) -> &Schedule<C> {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut Schedule<C> {
        &mut self.schedule
    }

    pub fn state(&self) -> JobState {
        self.machine.state()
    }

    pub fn events_read(&self) -> u64 {
        self.events_read
    }

    pub fn begin_job(&mut self) -> Result<(), ProcessError> {
        if self.job_begun {
            return Ok(());
        }
        self.job_begun = true;
        self.schedule.begin_job(&self.conditions)?;
        tracing::info!(process = %self.schedule.process_name(), "job begun");
        Ok(())
    }

    /// End the job on the schedule and the looper, attempting both.
    pub fn end_job(&mut self) -> Result<(), ProcessError> {
        if self.job_ended {
            return Ok(());
        }
        self.job_ended = true;
        let schedule = self.schedule.end_job();
        let looper = match self.looper.as_mut() {
            Some(looper) => looper.end_of_job().map_err(ProcessError::Looper),
            None => Ok(()),
        };
        tracing::info!(
            events = self.schedule.total_events(),
            passed = self.schedule.total_passed(),
            "job ended"
        );
        schedule?;
        looper
    }

    pub fn run_to_completion(&mut self) -> Result<RunStatus, ProcessError> {
        self.run(None)
    }

    /// Process at most `count` events, then pause.
    pub fn run_event_count(&mut self, count: u64) -> Result<RunStatus, ProcessError> {
        self.run(Some(count))
    }

    fn run(&mut self, limit: Option<u64>) -> Result<RunStatus, ProcessError> {
        self.begin_job()?;
        let mut processed = 0;
        while !self.machine.is_terminated() {
            if limit.is_some_and(|limit| processed >= limit) {
                return Ok(RunStatus::CountComplete);
            }
            let event = match self.next_job_event() {
                Ok(event) => event,
                Err(err) => return Err(self.fail(err)),
            };
            for effect in self.machine.process(event) {
                if let Err(err) = self.execute(&effect) {
                    return Err(self.fail(err));
                }
                if effect == Effect::ProcessEvent {
                    processed += 1;
                }
            }
        }
        match self.protocol_error.take() {
            Some((state, event)) => Err(ProcessError::Protocol { state, event }),
            None => Ok(RunStatus::Success),
        }
    }

    /// Bring the machine to its terminal state without further module calls.
    fn fail(&mut self, err: ProcessError) -> ProcessError {
        tracing::error!(
            module = err.module().map(|l| l.as_str()),
            path = err.path().map(|p| p.as_str()),
            "stopping job: {}",
            err
        );
        self.machine.abort();
        self.machine.process(JobEvent::Stop);
        self.machine.process(JobEvent::Stop);
        self.runs.clear();
        self.lumis.clear();
        self.pending_run = None;
        self.pending_lumi = None;
        self.queued = None;
        err
    }

    fn next_job_event(&mut self) -> Result<JobEvent, ProcessError> {
        if let Some(event) = self.queued.take() {
            return Ok(event);
        }
        if self.stop_requested {
            return Ok(JobEvent::Stop);
        }
        if self.max_events.is_some_and(|max| self.pass_events >= max) {
            tracing::info!(max_events = self.pass_events, "input event limit reached");
            return Ok(JobEvent::Stop);
        }
        Ok(match self.source.next_item_type()? {
            ItemType::File => JobEvent::File,
            ItemType::Run => {
                let run = self.source.read_run()?;
                let number = run.run;
                self.pending_run = Some(run);
                JobEvent::Run(number)
            }
            ItemType::Lumi => {
                let lumi = self.source.read_lumi()?;
                let number = lumi.lumi;
                self.pending_lumi = Some(lumi);
                JobEvent::Lumi(number)
            }
            ItemType::Event => JobEvent::Event,
            ItemType::Stop => JobEvent::Stop,
        })
    }

    fn execute(&mut self, effect: &Effect) -> Result<(), ProcessError> {
        tracing::trace!(effect = effect.name(), fields = ?effect.fields(), "executing");
        match effect {
            Effect::StartingNewLoop => {
                self.iteration += 1;
                if let Some(looper) = self.looper.as_mut() {
                    looper
                        .starting_new_loop(self.iteration)
                        .map_err(ProcessError::Looper)?;
                }
            }
            Effect::EndOfLoop => {
                let outcome = match self.looper.as_mut() {
                    Some(looper) if self.protocol_error.is_none() => {
                        looper.end_of_loop(self.iteration)
                    }
                    _ => Ok(true),
                };
                let stop = outcome.map_err(ProcessError::Looper)?;
                self.queued = Some(if stop {
                    JobEvent::Stop
                } else {
                    JobEvent::Restart
                });
            }
            Effect::PrepareForNextLoop => {
                if let Some(looper) = self.looper.as_mut() {
                    looper
                        .prepare_for_next_loop()
                        .map_err(ProcessError::Looper)?;
                }
                self.stop_requested = false;
            }
            Effect::RewindInput => {
                self.source.rewind()?;
                self.pass_events = 0;
            }

            Effect::OpenInputFile => {
                let file = self.source.read_file()?;
                tracing::info!(file = %file.name, "opened input file");
                self.schedule.respond_to_open_input_file(&file)?;
                self.file = Some(file);
            }
            Effect::CloseInputFile => {
                self.source.close_file()?;
                let file = self.file.as_ref().ok_or_else(|| missing("file"))?;
                self.schedule.respond_to_close_input_file(file)?;
            }
            Effect::OpenOutputFiles => {
                let file = self.file.as_ref().ok_or_else(|| missing("file"))?;
                self.schedule.open_output_files(file)?;
            }
            Effect::CloseOutputFiles => {
                let file = self.file.as_ref().ok_or_else(|| missing("file"))?;
                self.schedule.close_output_files(file)?;
            }

            Effect::CacheRun { run } => {
                let principal = self.take_pending_run(*run);
                self.runs.insert(*run, principal);
            }
            Effect::MergeRun { run } => {
                let principal = self.take_pending_run(*run);
                self.runs
                    .get_mut(run)
                    .ok_or_else(|| missing(&format!("run {}", run)))?
                    .merge(principal);
            }
            Effect::BeginRun { run } => {
                let principal = self
                    .runs
                    .get(run)
                    .ok_or_else(|| missing(&format!("run {}", run)))?;
                self.schedule.begin_run(principal, &self.conditions)?;
            }
            Effect::EndRun { run } => {
                let principal = self
                    .runs
                    .get(run)
                    .ok_or_else(|| missing(&format!("run {}", run)))?;
                self.schedule.end_run(principal, &self.conditions)?;
            }
            Effect::WriteRun { run } => {
                let principal = self
                    .runs
                    .get(run)
                    .ok_or_else(|| missing(&format!("run {}", run)))?;
                self.schedule.write_run(principal)?;
            }
            Effect::DeleteRun { run } => {
                self.runs.remove(run);
            }

            Effect::CacheLumi { run, lumi } => {
                let principal = self.take_pending_lumi(*run, *lumi);
                self.lumis.insert((*run, *lumi), principal);
            }
            Effect::MergeLumi { run, lumi } => {
                let principal = self.take_pending_lumi(*run, *lumi);
                self.lumis
                    .get_mut(&(*run, *lumi))
                    .ok_or_else(|| missing(&format!("lumi {}.{}", run, lumi)))?
                    .merge(principal);
            }
            Effect::BeginLumi { run, lumi } => {
                let principal = cached_lumi(&self.lumis, *run, *lumi)?;
                self.schedule.begin_lumi(principal, &self.conditions)?;
            }
            Effect::EndLumi { run, lumi } => {
                let principal = cached_lumi(&self.lumis, *run, *lumi)?;
                self.schedule.end_lumi(principal, &self.conditions)?;
            }
            Effect::WriteLumi { run, lumi } => {
                let principal = cached_lumi(&self.lumis, *run, *lumi)?;
                self.schedule.write_lumi(principal)?;
            }
            Effect::DeleteLumi { run, lumi } => {
                self.lumis.remove(&(*run, *lumi));
            }

            Effect::ProcessEvent => self.process_event()?,

            Effect::ProtocolError { state, event } => {
                tracing::error!(state = %state, event = %event, "unexpected input item");
                self.protocol_error = Some((state.clone(), event.clone()));
                self.stop_requested = true;
            }
        }
        Ok(())
    }

    fn process_event(&mut self) -> Result<(), ProcessError> {
        let principal = self.source.read_event()?;
        self.events_read += 1;
        self.pass_events += 1;
        self.schedule
            .process_one_event(&principal, &self.conditions)?;

        if let Some(looper) = self.looper.as_mut() {
            if looper.during_loop(&principal).map_err(ProcessError::Looper)? {
                self.stop_requested = true;
            }
        }
        if self.schedule.terminate() {
            tracing::info!("every output module reached its event limit");
            self.stop_requested = true;
        }
        Ok(())
    }

    /// The record read for this run, or a fresh one when the source had none.
    fn take_pending_run(&mut self, run: RunNumber) -> RunPrincipal {
        match self.pending_run.take() {
            Some(principal) if principal.run == run => principal,
            _ => RunPrincipal::new(run),
        }
    }

    fn take_pending_lumi(&mut self, run: RunNumber, lumi: LumiNumber) -> LumiPrincipal {
        match self.pending_lumi.take() {
            Some(principal) if principal.run == run && principal.lumi == lumi => principal,
            _ => LumiPrincipal::new(run, lumi),
        }
    }
}

impl<C: Clock> std::fmt::Debug for EventProcessor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventProcessor")
            .field("state", &self.machine.state())
            .field("events_read", &self.events_read)
            .field("schedule", &self.schedule)
            .finish()
    }
}

fn cached_lumi(
    lumis: &BTreeMap<(RunNumber, LumiNumber), LumiPrincipal>,
    run: RunNumber,
    lumi: LumiNumber,
) -> Result<&LumiPrincipal, ProcessError> {
    lumis
        .get(&(run, lumi))
        .ok_or_else(|| missing(&format!("lumi {}.{}", run, lumi)))
}

fn missing(what: &str) -> ProcessError {
    ProcessError::MissingRecord(what.to_string())
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;

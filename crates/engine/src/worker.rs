// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workers: one per module instance
//!
//! A worker wraps a module with per-event memoization, counters, timing,
//! and failure containment. A worker shared by several paths runs its
//! module at most once per occurrence. Later calls replay the cached
//! outcome until [`Worker::reset`].

use crate::error::{Failure, WorkerError};
use crate::observer::Observers;
use evs_core::{
    Clock, Conditions, Event, FileBlock, FileTransition, LumiPrincipal, Module, ModuleDescription,
    ModuleError, Occurrence, ProductResolver, RunPrincipal, SharedTriggerBits, Stopwatch, Timing,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Index of a worker in a schedule's worker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

/// Outcome of the current occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Ready,
    Pass,
    Fail,
    Exception,
}

/// Event-phase counters.
///
/// `times_visited` counts every request. The others count actual
/// executions, so `times_run == times_passed + times_failed + times_except`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerCounters {
    pub times_visited: u64,
    pub times_run: u64,
    pub times_passed: u64,
    pub times_failed: u64,
    pub times_except: u64,
}

/// What a worker needs from its schedule while running.
pub struct Context<'a, C: Clock> {
    pub conditions: &'a Conditions,
    pub clock: &'a C,
    pub resolver: Option<&'a dyn ProductResolver>,
}

/// Event selection and write limit of an output worker.
#[derive(Debug)]
pub struct OutputControl {
    limit: Option<u64>,
    written: u64,
    select_bits: Vec<usize>,
    trigger_bits: SharedTriggerBits,
}

impl OutputControl {
    pub fn new(
        limit: Option<u64>,
        select_bits: Vec<usize>,
        trigger_bits: SharedTriggerBits,
    ) -> Self {
        Self {
            limit,
            written: 0,
            select_bits,
            trigger_bits,
        }
    }

    pub fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.written >= limit)
    }

    /// Whether the current event should be written.
    fn wants_event(&self) -> bool {
        if self.limit_reached() {
            return false;
        }
        if self.select_bits.is_empty() {
            return true;
        }
        let bits = self.trigger_bits.lock();
        self.select_bits.iter().any(|&bit| bits.passed(bit))
    }
}

/// A module wrapped for scheduling.
pub struct Worker {
    description: ModuleDescription,
    module: Module,
    state: WorkerState,
    cached_error: Option<WorkerError>,
    counters: WorkerCounters,
    timing: Timing,
    output: Option<OutputControl>,
    observers: Observers,
    job_begun: bool,
    job_ended: bool,
}

impl Worker {
    pub fn new(description: ModuleDescription, module: Module, observers: Observers) -> Self {
        for observer in observers.iter() {
            observer.module_constructed(&description);
        }
        Self {
            description,
            module,
            state: WorkerState::Ready,
            cached_error: None,
            counters: WorkerCounters::default(),
            timing: Timing::default(),
            output: None,
            observers,
            job_begun: false,
            job_ended: false,
        }
    }

    /// Attach event selection and a write limit. Only meaningful for outputs.
    pub fn with_output_control(mut self, control: OutputControl) -> Self {
        self.output = Some(control);
        self
    }

    pub fn description(&self) -> &ModuleDescription {
        &self.description
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn counters(&self) -> WorkerCounters {
        self.counters
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// True for output workers whose write limit is used up.
    pub fn limit_reached(&self) -> bool {
        self.output
            .as_ref()
            .is_some_and(OutputControl::limit_reached)
    }

    /// Run the module for an occurrence, or replay the memoized outcome.
    ///
    /// Returns the filter decision. Non-filters always pass, and non-event
    /// occurrences always pass when they succeed.
    pub fn run<C: Clock>(
        &mut self,
        occurrence: Occurrence<'_>,
        cx: &Context<'_, C>,
    ) -> Result<bool, WorkerError> {
        let is_event = occurrence.is_event();
        if is_event {
            self.counters.times_visited += 1;
        }
        match self.state {
            WorkerState::Pass => return Ok(true),
            WorkerState::Fail => return Ok(false),
            WorkerState::Exception => {
                if let Some(err) = &self.cached_error {
                    return Err(err.clone());
                }
            }
            WorkerState::Ready => {}
        }

        let stage = occurrence.phase().as_str();
        if is_event {
            self.counters.times_run += 1;
        }
        for observer in self.observers.iter() {
            observer.pre_module(&self.description, stage);
        }
        let watch = Stopwatch::start(cx.clock);
        let result = self.invoke(occurrence, cx);
        let elapsed = watch.stop();
        for observer in self.observers.iter() {
            observer.post_module(&self.description, stage, result.is_ok());
        }
        if is_event {
            self.timing.add(elapsed);
        }

        match result {
            Ok(pass) => {
                self.state = if pass {
                    WorkerState::Pass
                } else {
                    WorkerState::Fail
                };
                if is_event {
                    if pass {
                        self.counters.times_passed += 1;
                    } else {
                        self.counters.times_failed += 1;
                    }
                }
                Ok(pass)
            }
            Err(failure) => {
                let err = self.error(stage, failure);
                tracing::error!(
                    label = %self.description.label,
                    stage,
                    category = err.category(),
                    "module failed: {}",
                    err.failure
                );
                self.state = WorkerState::Exception;
                self.cached_error = Some(err.clone());
                if is_event {
                    self.counters.times_except += 1;
                }
                Err(err)
            }
        }
    }

    fn invoke<C: Clock>(
        &mut self,
        occurrence: Occurrence<'_>,
        cx: &Context<'_, C>,
    ) -> Result<bool, Failure> {
        let Self {
            description,
            module,
            output,
            ..
        } = self;
        match occurrence {
            Occurrence::Event(principal) => {
                if let Some(control) = output.as_ref() {
                    if !control.wants_event() {
                        return Ok(true);
                    }
                }
                let label = &description.label;
                let mut event = Event::new(principal, label, cx.conditions, cx.resolver);
                let pass = contain(|| module.process_event(&mut event))?;
                if let Some(control) = output.as_mut() {
                    control.written += 1;
                }
                Ok(pass)
            }
            other => {
                contain(|| module.process_transition(other, cx.conditions))?;
                Ok(true)
            }
        }
    }

    /// Clear the memoized outcome before the next occurrence.
    pub fn reset(&mut self) {
        self.state = WorkerState::Ready;
        self.cached_error = None;
    }

    pub fn clear_counters(&mut self) {
        self.counters = WorkerCounters::default();
        self.timing = Timing::default();
    }

    pub fn begin_job(&mut self, conditions: &Conditions) -> Result<(), WorkerError> {
        if self.job_begun {
            return Ok(());
        }
        self.job_begun = true;
        self.guarded("begin_job", |m| m.begin_job(conditions))
    }

    /// Run the module's end-job callback once.
    pub fn end_job(&mut self) -> Result<(), WorkerError> {
        if self.job_ended {
            return Ok(());
        }
        self.job_ended = true;
        self.guarded("end_job", |m| m.end_job())
    }

    pub fn respond_to_file(
        &mut self,
        transition: FileTransition,
        file: &FileBlock,
    ) -> Result<(), WorkerError> {
        let stage = match transition {
            FileTransition::OpenInput => "open_input_file",
            FileTransition::CloseInput => "close_input_file",
            FileTransition::OpenOutput => "open_output_files",
            FileTransition::CloseOutput => "close_output_files",
        };
        self.guarded(stage, |m| m.respond_to_file(transition, file))
    }

    pub fn open_output_file(&mut self, file: &FileBlock) -> Result<(), WorkerError> {
        self.guarded("open_file", |m| match m.as_output() {
            Some(out) => out.open_file(file),
            None => Ok(()),
        })
    }

    pub fn close_output_file(&mut self) -> Result<(), WorkerError> {
        self.guarded("close_file", |m| match m.as_output() {
            Some(out) => out.close_file(),
            None => Ok(()),
        })
    }

    pub fn write_run(&mut self, run: &RunPrincipal) -> Result<(), WorkerError> {
        self.guarded("write_run", |m| match m.as_output() {
            Some(out) => out.write_run(run),
            None => Ok(()),
        })
    }

    pub fn write_lumi(&mut self, lumi: &LumiPrincipal) -> Result<(), WorkerError> {
        self.guarded("write_lumi", |m| match m.as_output() {
            Some(out) => out.write_lumi(lumi),
            None => Ok(()),
        })
    }

    /// Swap in a new module instance and begin its job.
    pub fn replace_module(
        &mut self,
        module: Module,
        conditions: &Conditions,
    ) -> Result<(), WorkerError> {
        self.module = module;
        self.reset();
        self.job_begun = false;
        self.job_ended = false;
        self.begin_job(conditions)
    }

    fn guarded(
        &mut self,
        stage: &'static str,
        call: impl FnOnce(&mut Module) -> Result<(), ModuleError>,
    ) -> Result<(), WorkerError> {
        for observer in self.observers.iter() {
            observer.pre_module(&self.description, stage);
        }
        let module = &mut self.module;
        let result = contain(|| call(module));
        for observer in self.observers.iter() {
            observer.post_module(&self.description, stage, result.is_ok());
        }
        result.map_err(|failure| {
            let err = self.error(stage, failure);
            tracing::error!(
                label = %self.description.label,
                stage,
                "module failed: {}",
                err.failure
            );
            err
        })
    }

    fn error(&self, stage: &'static str, failure: Failure) -> WorkerError {
        WorkerError {
            label: self.description.label.clone(),
            type_name: self.description.type_name.clone(),
            stage,
            failure,
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("label", &self.description.label)
            .field("kind", &self.description.kind)
            .field("state", &self.state)
            .finish()
    }
}

/// Run module code, turning both errors and panics into a [`Failure`].
fn contain<T>(call: impl FnOnce() -> Result<T, ModuleError>) -> Result<T, Failure> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Failure::Raised(err)),
        Err(payload) => Err(Failure::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

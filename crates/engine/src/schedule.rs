// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The schedule: workers, paths and the per-event loop
//!
//! Assembly turns a [`ProcessConfig`] plus instantiated modules into a
//! worker table, trigger paths and end paths. Every event then runs the
//! trigger paths in bit order, the trigger-results inserter, and the end
//! paths.

use crate::error::{ConfigError, ScheduleError};
use crate::inserter::{TriggerResultInserter, INSERTER_TYPE, TRIGGER_RESULTS_LABEL};
use crate::observer::{Observer, Observers};
use crate::path::Path;
use crate::report::{EventSummary, ModuleInPathSummary, PathSummary, TriggerReport, WorkerSummary};
use crate::unscheduled::Unscheduled;
use crate::worker::{Context, OutputControl, Worker, WorkerId};
use crate::worker_in_path::WorkerInPath;
use evs_config::{FilterAction, ModuleDef, OutputLimit, PathEntry, ProcessConfig};
use evs_core::{
    Clock, Conditions, EventPrincipal, FileBlock, FileTransition, LumiPrincipal, Module,
    ModuleDescription, ModuleKind, Occurrence, PathName, PathStatus, RunPrincipal,
    SharedTriggerBits, SystemClock, TriggerBits,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Workers organized into trigger paths and end paths.
pub struct Schedule<C: Clock = SystemClock> {
    process_name: String,
    workers: Vec<Worker>,
    trigger_paths: Vec<Path>,
    end_paths: Vec<Path>,
    empty_trigger_bits: Vec<usize>,
    empty_end_bits: Vec<usize>,
    trigger_names: Vec<PathName>,
    end_path_names: Vec<PathName>,
    trigger_bits: SharedTriggerBits,
    end_path_bits: SharedTriggerBits,
    inserter: Option<WorkerId>,
    outputs: Vec<WorkerId>,
    unscheduled: Unscheduled,
    total_events: u64,
    total_passed: u64,
    end_paths_enabled: bool,
    want_summary: bool,
    job_ended: bool,
    observers: Observers,
    clock: C,
}

impl<C: Clock> Schedule<C> {
    /// Assemble a schedule.
    ///
    /// `modules` holds one instance per configured label.
    pub fn new(
        config: &ProcessConfig,
        modules: IndexMap<String, Module>,
        observers: Vec<Arc<dyn Observer>>,
        clock: C,
    ) -> Result<Self, ConfigError> {
        Assembler::new(config, modules, Arc::new(observers))?.finish(clock)
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn begin_job(&mut self, conditions: &Conditions) -> Result<(), ScheduleError> {
        for worker in &mut self.workers {
            worker.begin_job(conditions)?;
        }
        for worker in self.unscheduled.workers_mut() {
            worker.begin_job(conditions)?;
        }
        for observer in self.observers.iter() {
            observer.post_begin_job();
        }
        tracing::debug!(
            workers = self.workers.len(),
            on_demand = self.unscheduled.len(),
            "schedule job begun"
        );
        Ok(())
    }

    /// End the job on every worker, collecting all failures.
    ///
    /// A second call does nothing.
    pub fn end_job(&mut self) -> Result<(), ScheduleError> {
        if self.job_ended {
            return Ok(());
        }
        self.job_ended = true;

        let mut failures = Vec::new();
        for worker in &mut self.workers {
            if let Err(err) = worker.end_job() {
                failures.push(err);
            }
        }
        for worker in self.unscheduled.workers_mut() {
            if let Err(err) = worker.end_job() {
                failures.push(err);
            }
        }
        for observer in self.observers.iter() {
            observer.post_end_job();
        }
        if self.want_summary {
            tracing::info!(target: "evs::summary", "\n{}", self.report());
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScheduleError::EndJob { failures })
        }
    }

    /// Run one event through every path.
    ///
    /// Returns whether the event was accepted by the trigger paths.
    pub fn process_one_event(
        &mut self,
        principal: &EventPrincipal,
        conditions: &Conditions,
    ) -> Result<bool, ScheduleError> {
        let span = tracing::debug_span!("event", id = %principal.id);
        let _guard = span.enter();
        for observer in self.observers.iter() {
            observer.pre_event(principal.id);
        }

        for worker in &mut self.workers {
            worker.reset();
        }
        self.unscheduled.reset();
        reset_bits(&self.trigger_bits, &self.empty_trigger_bits);
        reset_bits(&self.end_path_bits, &self.empty_end_bits);

        let result = self.run_event(principal, conditions);
        self.total_events += 1;
        let accepted = result.is_ok() && self.trigger_bits.lock().accept();
        if accepted {
            self.total_passed += 1;
        }
        for observer in self.observers.iter() {
            observer.post_event(principal.id, accepted);
        }
        result.map(|()| accepted)
    }

    fn run_event(
        &mut self,
        principal: &EventPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ScheduleError> {
        let resolver = self.unscheduled.resolver(&self.clock);
        let cx = Context {
            conditions,
            clock: &self.clock,
            resolver: Some(&resolver),
        };
        let occurrence = Occurrence::Event(principal);

        for path in &mut self.trigger_paths {
            path.run(&mut self.workers, occurrence, &cx)?;
        }
        if let Some(id) = self.inserter {
            self.workers[id.0].run(occurrence, &cx)?;
        }
        if self.end_paths_enabled {
            for path in &mut self.end_paths {
                path.run(&mut self.workers, occurrence, &cx)?;
            }
        }
        Ok(())
    }

    pub fn begin_run(
        &mut self,
        run: &RunPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ScheduleError> {
        self.run_transition(Occurrence::BeginRun(run), conditions)
    }

    pub fn end_run(
        &mut self,
        run: &RunPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ScheduleError> {
        self.run_transition(Occurrence::EndRun(run), conditions)
    }

    pub fn begin_lumi(
        &mut self,
        lumi: &LumiPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ScheduleError> {
        self.run_transition(Occurrence::BeginLumi(lumi), conditions)
    }

    pub fn end_lumi(
        &mut self,
        lumi: &LumiPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ScheduleError> {
        self.run_transition(Occurrence::EndLumi(lumi), conditions)
    }

    fn run_transition(
        &mut self,
        occurrence: Occurrence<'_>,
        conditions: &Conditions,
    ) -> Result<(), ScheduleError> {
        let span = tracing::debug_span!("transition", phase = %occurrence.phase());
        let _guard = span.enter();
        for worker in &mut self.workers {
            worker.reset();
        }
        let cx = Context {
            conditions,
            clock: &self.clock,
            resolver: None,
        };

        for path in &mut self.trigger_paths {
            path.run(&mut self.workers, occurrence, &cx)?;
        }
        if let Some(id) = self.inserter {
            self.workers[id.0].run(occurrence, &cx)?;
        }
        if self.end_paths_enabled {
            for path in &mut self.end_paths {
                path.run(&mut self.workers, occurrence, &cx)?;
            }
        }
        self.unscheduled.run_transition(occurrence, &cx)?;
        Ok(())
    }

    pub fn respond_to_open_input_file(&mut self, file: &FileBlock) -> Result<(), ScheduleError> {
        self.respond_to_file(FileTransition::OpenInput, file)
    }

    pub fn respond_to_close_input_file(&mut self, file: &FileBlock) -> Result<(), ScheduleError> {
        self.respond_to_file(FileTransition::CloseInput, file)
    }

    /// Open the output modules' files, then notify every module.
    pub fn open_output_files(&mut self, file: &FileBlock) -> Result<(), ScheduleError> {
        for &id in &self.outputs {
            self.workers[id.0].open_output_file(file)?;
        }
        self.respond_to_file(FileTransition::OpenOutput, file)
    }

    /// Close the output modules' files, then notify every module.
    pub fn close_output_files(&mut self, file: &FileBlock) -> Result<(), ScheduleError> {
        for &id in &self.outputs {
            self.workers[id.0].close_output_file()?;
        }
        self.respond_to_file(FileTransition::CloseOutput, file)
    }

    pub fn write_run(&mut self, run: &RunPrincipal) -> Result<(), ScheduleError> {
        for &id in &self.outputs {
            self.workers[id.0].write_run(run)?;
        }
        Ok(())
    }

    pub fn write_lumi(&mut self, lumi: &LumiPrincipal) -> Result<(), ScheduleError> {
        for &id in &self.outputs {
            self.workers[id.0].write_lumi(lumi)?;
        }
        Ok(())
    }

    fn respond_to_file(
        &mut self,
        transition: FileTransition,
        file: &FileBlock,
    ) -> Result<(), ScheduleError> {
        for worker in &mut self.workers {
            worker.respond_to_file(transition, file)?;
        }
        for worker in self.unscheduled.workers_mut() {
            worker.respond_to_file(transition, file)?;
        }
        Ok(())
    }

    /// True when every output module has reached its event limit.
    ///
    /// A schedule without output modules never asks to terminate.
    pub fn terminate(&self) -> bool {
        !self.outputs.is_empty()
            && self
                .outputs
                .iter()
                .all(|id| self.workers[id.0].limit_reached())
    }

    pub fn enable_end_paths(&mut self, enabled: bool) {
        self.end_paths_enabled = enabled;
    }

    pub fn end_paths_enabled(&self) -> bool {
        self.end_paths_enabled
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    pub fn total_passed(&self) -> u64 {
        self.total_passed
    }

    pub fn total_failed(&self) -> u64 {
        self.total_events - self.total_passed
    }

    pub fn trigger_names(&self) -> &[PathName] {
        &self.trigger_names
    }

    pub fn end_path_names(&self) -> &[PathName] {
        &self.end_path_names
    }

    pub fn trigger_bits(&self) -> TriggerBits {
        self.trigger_bits.lock().clone()
    }

    pub fn end_path_bits(&self) -> TriggerBits {
        self.end_path_bits.lock().clone()
    }

    /// Descriptions of every worker, scheduled ones first.
    pub fn module_descriptions(&self) -> Vec<ModuleDescription> {
        self.workers
            .iter()
            .map(|w| w.description().clone())
            .chain(
                self.unscheduled
                    .workers()
                    .map(|w| w.borrow().description().clone()),
            )
            .collect()
    }

    /// Replace the module behind a label and begin its job.
    ///
    /// Returns `Ok(false)` when no worker has the label.
    pub fn change_module(
        &mut self,
        label: &str,
        module: Module,
        conditions: &Conditions,
    ) -> Result<bool, ScheduleError> {
        let worker = match self.workers.iter_mut().find(|w| w.description().label == label) {
            Some(worker) => worker,
            None => match self.unscheduled.get_mut(label) {
                Some(worker) => worker,
                None => return Ok(false),
            },
        };
        let current = worker.description().kind;
        if module.kind() != current {
            return Err(ConfigError::KindMismatch {
                label: label.to_string(),
                declared: current,
                actual: module.kind(),
            }
            .into());
        }
        tracing::info!(label, "replacing module");
        worker.replace_module(module, conditions)?;
        Ok(true)
    }

    pub fn clear_counters(&mut self) {
        for worker in &mut self.workers {
            worker.clear_counters();
        }
        for worker in self.unscheduled.workers_mut() {
            worker.clear_counters();
        }
        for path in self.trigger_paths.iter_mut().chain(self.end_paths.iter_mut()) {
            path.clear_counters();
        }
        self.total_events = 0;
        self.total_passed = 0;
    }

    pub fn report(&self) -> TriggerReport {
        let workers = self
            .workers
            .iter()
            .map(worker_summary)
            .chain(self.unscheduled.workers().map(|w| worker_summary(&w.borrow())))
            .collect();
        TriggerReport {
            event_summary: EventSummary {
                total_events: self.total_events,
                total_passed: self.total_passed,
                total_failed: self.total_failed(),
            },
            trigger_paths: self.summaries(&self.trigger_paths),
            end_paths: self.summaries(&self.end_paths),
            workers,
        }
    }

    fn summaries(&self, paths: &[Path]) -> Vec<PathSummary> {
        paths.iter().map(|p| self.path_summary(p)).collect()
    }

    fn path_summary(&self, path: &Path) -> PathSummary {
        let counters = path.counters();
        PathSummary {
            name: path.name().to_string(),
            bit_position: path.bit(),
            times_run: counters.times_run,
            times_passed: counters.times_passed,
            times_failed: counters.times_failed,
            times_except: counters.times_except,
            modules: path
                .workers()
                .iter()
                .map(|wip| {
                    let c = wip.counters();
                    ModuleInPathSummary {
                        label: self.workers[wip.worker().0].description().label.to_string(),
                        action: wip.action(),
                        times_visited: c.times_visited,
                        times_passed: c.times_passed,
                        times_failed: c.times_failed,
                        times_except: c.times_except,
                    }
                })
                .collect(),
        }
    }
}

impl<C: Clock> std::fmt::Debug for Schedule<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("process_name", &self.process_name)
            .field("workers", &self.workers.len())
            .field("trigger_paths", &self.trigger_names)
            .field("end_paths", &self.end_path_names)
            .finish()
    }
}

fn worker_summary(worker: &Worker) -> WorkerSummary {
    let c = worker.counters();
    let timing = worker.timing();
    WorkerSummary {
        label: worker.description().label.to_string(),
        type_name: worker.description().type_name.clone(),
        times_visited: c.times_visited,
        times_run: c.times_run,
        times_passed: c.times_passed,
        times_failed: c.times_failed,
        times_except: c.times_except,
        cpu_time: timing.cpu.as_secs_f64(),
        real_time: timing.real.as_secs_f64(),
    }
}

/// Reset a bit vector; bits of empty paths always pass.
fn reset_bits(bits: &SharedTriggerBits, empty: &[usize]) {
    let mut bits = bits.lock();
    bits.reset();
    for &bit in empty {
        bits.set(bit, PathStatus::Pass);
    }
}

// ── Assembly ────────────────────────────────────────────────────────────────

struct Assembler<'a> {
    config: &'a ProcessConfig,
    modules: IndexMap<String, Module>,
    observers: Observers,
    workers: Vec<Worker>,
    ids: HashMap<String, WorkerId>,
    outputs: Vec<WorkerId>,
    trigger_names: Vec<PathName>,
    trigger_bits: SharedTriggerBits,
}

impl<'a> Assembler<'a> {
    fn new(
        config: &'a ProcessConfig,
        modules: IndexMap<String, Module>,
        observers: Observers,
    ) -> Result<Self, ConfigError> {
        for (label, def) in &config.modules {
            if label == TRIGGER_RESULTS_LABEL {
                return Err(ConfigError::ReservedLabel {
                    label: label.clone(),
                });
            }
            let module = modules.get(label).ok_or_else(|| ConfigError::MissingModule {
                label: label.clone(),
            })?;
            if let Some(declared) = def.kind {
                if declared != module.kind() {
                    return Err(ConfigError::KindMismatch {
                        label: label.clone(),
                        declared,
                        actual: module.kind(),
                    });
                }
            }
        }
        if let Some(label) = modules.keys().find(|l| !config.modules.contains_key(*l)) {
            return Err(ConfigError::UnconfiguredModule {
                label: label.clone(),
            });
        }
        check_output_limits(config, &modules)?;

        let trigger_names: Vec<PathName> = config.paths.keys().map(PathName::new).collect();
        let trigger_bits = TriggerBits::shared(trigger_names.len());
        Ok(Self {
            config,
            modules,
            observers,
            workers: Vec::new(),
            ids: HashMap::new(),
            outputs: Vec::new(),
            trigger_names,
            trigger_bits,
        })
    }

    fn finish<C: Clock>(mut self, clock: C) -> Result<Schedule<C>, ConfigError> {
        let config = self.config;
        let trigger_bits = Arc::clone(&self.trigger_bits);
        let (trigger_paths, empty_trigger_bits) =
            self.build_paths(config.trigger_paths(), false, &trigger_bits)?;

        let inserter = if self.trigger_names.is_empty() {
            None
        } else {
            let module = Module::producer(TriggerResultInserter::new(
                self.trigger_names.clone(),
                Arc::clone(&trigger_bits),
            ));
            let kind = ModuleKind::Producer;
            let description = ModuleDescription::new(TRIGGER_RESULTS_LABEL, INSERTER_TYPE, kind)
                .with_process_name(&config.process);
            Some(self.push(Worker::new(description, module, Arc::clone(&self.observers))))
        };

        let end_path_names: Vec<PathName> = config.end_paths.keys().map(PathName::new).collect();
        let end_path_bits = TriggerBits::shared(end_path_names.len());
        let (end_paths, empty_end_bits) =
            self.build_paths(config.end_path_entries(), true, &end_path_bits)?;

        let unscheduled = self.unscheduled()?;

        tracing::debug!(
            process = %config.process,
            workers = self.workers.len(),
            trigger_paths = trigger_paths.len(),
            end_paths = end_paths.len(),
            "schedule assembled"
        );
        Ok(Schedule {
            process_name: config.process.clone(),
            workers: self.workers,
            trigger_paths,
            end_paths,
            empty_trigger_bits,
            empty_end_bits,
            trigger_names: self.trigger_names,
            end_path_names,
            trigger_bits,
            end_path_bits,
            inserter,
            outputs: self.outputs,
            unscheduled,
            total_events: 0,
            total_passed: 0,
            end_paths_enabled: true,
            want_summary: config.options.want_summary,
            job_ended: false,
            observers: self.observers,
            clock,
        })
    }

    /// Build paths in bit order. Empty paths keep their bit but get no Path.
    fn build_paths(
        &mut self,
        paths: Vec<(String, Vec<PathEntry>)>,
        end_path: bool,
        bits: &SharedTriggerBits,
    ) -> Result<(Vec<Path>, Vec<usize>), ConfigError> {
        let mut built = Vec::new();
        let mut empty = Vec::new();
        for (bit, (name, entries)) in paths.into_iter().enumerate() {
            let mut workers = Vec::new();
            for entry in entries {
                let id = self.worker_for(&entry.label, &name, end_path)?;
                let action = self.action_for(&entry, id, &name, end_path);
                workers.push(WorkerInPath::new(id, action));
            }
            if workers.is_empty() {
                tracing::debug!(path = %name, bit, "empty path");
                empty.push(bit);
                continue;
            }
            built.push(Path::new(name, bit, end_path, workers, Arc::clone(bits)));
        }
        Ok((built, empty))
    }

    /// Find or create the worker for a label on a path.
    fn worker_for(
        &mut self,
        label: &str,
        path: &str,
        end_path: bool,
    ) -> Result<WorkerId, ConfigError> {
        let id = match self.ids.get(label) {
            Some(&id) => id,
            None => {
                let def = self
                    .config
                    .get_module(label)
                    .ok_or_else(|| ConfigError::UnknownLabel {
                        label: label.to_string(),
                        path: path.to_string(),
                        end_path,
                    })?;
                let worker = self.create_worker(def)?;
                let id = self.push(worker);
                self.ids.insert(label.to_string(), id);
                id
            }
        };
        if !end_path && self.workers[id.0].description().kind == ModuleKind::Output {
            return Err(ConfigError::OutputOnTriggerPath {
                label: label.to_string(),
                path: path.to_string(),
            });
        }
        Ok(id)
    }

    fn action_for(
        &self,
        entry: &PathEntry,
        id: WorkerId,
        path: &str,
        end_path: bool,
    ) -> FilterAction {
        let description = self.workers[id.0].description();
        let allowed = &self.config.options.filters_on_endpaths;
        if end_path
            && entry.action == FilterAction::Normal
            && description.kind == ModuleKind::Filter
            && !allowed.contains(&description.type_name)
        {
            tracing::warn!(
                label = %entry.label,
                type_name = %description.type_name,
                path,
                "filter on end path is ignored; list its type in filters_on_endpaths to use it"
            );
            return FilterAction::Ignore;
        }
        entry.action
    }

    fn create_worker(&mut self, def: &ModuleDef) -> Result<Worker, ConfigError> {
        let module = self
            .modules
            .shift_remove(&def.label)
            .ok_or_else(|| ConfigError::MissingModule {
                label: def.label.clone(),
            })?;
        let kind = module.kind();
        let description = ModuleDescription::new(def.label.as_str(), def.type_name.as_str(), kind)
            .with_process_name(&self.config.process)
            .with_config_id(def.config_id());
        let worker = Worker::new(description, module, Arc::clone(&self.observers));
        if kind != ModuleKind::Output {
            return Ok(worker);
        }

        let limit = output_limit(self.config, def)?;
        let mut select_bits = Vec::new();
        for path in &def.select_events {
            let bit = self
                .trigger_names
                .iter()
                .position(|name| name == path.as_str())
                .ok_or_else(|| ConfigError::UnknownSelectPath {
                    label: def.label.clone(),
                    path: path.clone(),
                })?;
            select_bits.push(bit);
        }
        let control = OutputControl::new(limit, select_bits, Arc::clone(&self.trigger_bits));
        Ok(worker.with_output_control(control))
    }

    fn push(&mut self, worker: Worker) -> WorkerId {
        let id = WorkerId(self.workers.len());
        if worker.description().kind == ModuleKind::Output {
            self.outputs.push(id);
        }
        self.workers.push(worker);
        id
    }

    /// Modules left after path assembly run on demand or are dropped.
    fn unscheduled(&mut self) -> Result<Unscheduled, ConfigError> {
        let mut unscheduled = Unscheduled::new();
        let allow = self.config.options.allow_unscheduled;
        for (label, module) in std::mem::take(&mut self.modules) {
            let def = self
                .config
                .get_module(&label)
                .ok_or_else(|| ConfigError::UnconfiguredModule {
                    label: label.clone(),
                })?;
            let kind = module.kind();
            if allow && kind.can_run_on_demand() {
                let type_name = def.type_name.as_str();
                let description = ModuleDescription::new(label.as_str(), type_name, kind)
                    .with_process_name(&self.config.process)
                    .with_config_id(def.config_id());
                unscheduled.insert(Worker::new(description, module, Arc::clone(&self.observers)));
            } else {
                tracing::warn!(
                    label = %label,
                    type_name = %def.type_name,
                    "module is not on any path and will not run"
                );
            }
        }
        Ok(unscheduled)
    }
}

fn output_limit(config: &ProcessConfig, def: &ModuleDef) -> Result<Option<u64>, ConfigError> {
    match (&config.max_events.output, def.max_events) {
        (Some(_), Some(_)) => Err(ConfigError::OutputLimitConflict {
            label: def.label.clone(),
        }),
        (None, limit) => Ok(limit),
        (Some(OutputLimit::All(limit)), None) => Ok(Some(*limit)),
        (Some(OutputLimit::PerModule(table)), None) => table
            .get(&def.label)
            .copied()
            .map(Some)
            .ok_or_else(|| ConfigError::MissingOutputLimit {
                label: def.label.clone(),
            }),
    }
}

/// Checks that need to know which modules are outputs.
fn check_output_limits(
    config: &ProcessConfig,
    modules: &IndexMap<String, Module>,
) -> Result<(), ConfigError> {
    let is_output = |label: &str| {
        modules
            .get(label)
            .is_some_and(|m| m.kind() == ModuleKind::Output)
    };
    for (label, def) in &config.modules {
        if def.max_events.is_some() && !is_output(label.as_str()) {
            return Err(ConfigError::InvalidOutputLimit {
                label: label.clone(),
                reason: "only output modules take max_events".to_string(),
            });
        }
        if is_output(label.as_str()) {
            output_limit(config, def)?;
        }
    }
    if let Some(OutputLimit::PerModule(table)) = &config.max_events.output {
        if let Some(label) = table.keys().find(|l| !is_output(l.as_str())) {
            return Err(ConfigError::InvalidOutputLimit {
                label: label.clone(),
                reason: "not an output module".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;

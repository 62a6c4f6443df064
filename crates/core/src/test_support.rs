// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::module::{
    Analyzer, Event, Filter, Lifecycle, Module, ModuleError, OutputModule, Producer,
};
use crate::principal::{Conditions, FileBlock, LumiPrincipal, RunPrincipal};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

// ── Call recording ──────────────────────────────────────────────────────────

/// Shared log of module calls, as `"<label>:<callback>"` strings.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, label: &str, call: &str) {
        self.calls.lock().push(format!("{}:{}", label, call));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls made by one label, callback names only.
    pub fn calls_for(&self, label: &str) -> Vec<String> {
        let prefix = format!("{}:", label);
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn count(&self, label: &str, call: &str) -> usize {
        self.calls_for(label).iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// What a fake module does when its event callback runs.
#[derive(Debug, Clone)]
pub enum Behavior {
    Pass,
    Reject,
    Fail(ModuleError),
    Panic(String),
}

macro_rules! recording_lifecycle {
    ($ty:ty) => {
        impl Lifecycle for $ty {
            fn begin_job(&mut self, _: &Conditions) -> Result<(), ModuleError> {
                self.record("begin_job");
                self.fail_on("begin_job")
            }

            fn end_job(&mut self) -> Result<(), ModuleError> {
                self.record("end_job");
                self.fail_on("end_job")
            }

            fn begin_run(&mut self, run: &RunPrincipal, _: &Conditions) -> Result<(), ModuleError> {
                self.record(&format!("begin_run({})", run.run));
                self.fail_on("begin_run")
            }

            fn end_run(&mut self, run: &RunPrincipal, _: &Conditions) -> Result<(), ModuleError> {
                self.record(&format!("end_run({})", run.run));
                self.fail_on("end_run")
            }

            fn begin_lumi(
                &mut self,
                lumi: &LumiPrincipal,
                _: &Conditions,
            ) -> Result<(), ModuleError> {
                self.record(&format!("begin_lumi({}.{})", lumi.run, lumi.lumi));
                self.fail_on("begin_lumi")
            }

            fn end_lumi(
                &mut self,
                lumi: &LumiPrincipal,
                _: &Conditions,
            ) -> Result<(), ModuleError> {
                self.record(&format!("end_lumi({}.{})", lumi.run, lumi.lumi));
                self.fail_on("end_lumi")
            }

            fn respond_to_open_input_file(&mut self, _: &FileBlock) -> Result<(), ModuleError> {
                self.record("open_input_file");
                Ok(())
            }

            fn respond_to_close_input_file(&mut self, _: &FileBlock) -> Result<(), ModuleError> {
                self.record("close_input_file");
                Ok(())
            }
        }
    };
}

/// A fake producer, filter or analyzer that records every call.
pub struct FakeModule {
    label: String,
    log: CallLog,
    script: VecDeque<Behavior>,
    default: Behavior,
    fail_callbacks: Vec<(String, ModuleError)>,
}

impl FakeModule {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
            script: VecDeque::new(),
            default: Behavior::Pass,
            fail_callbacks: Vec::new(),
        }
    }

    /// Behavior for every event not covered by [`FakeModule::then`].
    pub fn always(mut self, behavior: Behavior) -> Self {
        self.default = behavior;
        self
    }

    /// Behavior for the next event, queued in order.
    pub fn then(mut self, behavior: Behavior) -> Self {
        self.script.push_back(behavior);
        self
    }

    /// Fail a lifecycle callback (`"begin_job"`, `"end_run"`, ...).
    pub fn fail_callback(mut self, callback: &str, error: ModuleError) -> Self {
        self.fail_callbacks.push((callback.to_string(), error));
        self
    }

    pub fn into_producer(self) -> Module {
        Module::producer(self)
    }

    pub fn into_filter(self) -> Module {
        Module::filter(self)
    }

    pub fn into_analyzer(self) -> Module {
        Module::analyzer(self)
    }

    fn record(&self, call: &str) {
        self.log.push(&self.label, call);
    }

    fn fail_on(&self, callback: &str) -> Result<(), ModuleError> {
        match self.fail_callbacks.iter().find(|(c, _)| c == callback) {
            Some((_, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_behavior(&mut self) -> Result<bool, ModuleError> {
        let behavior = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.default.clone());
        match behavior {
            Behavior::Pass => Ok(true),
            Behavior::Reject => Ok(false),
            Behavior::Fail(err) => Err(err),
            Behavior::Panic(msg) => panic!("{}", msg),
        }
    }
}

recording_lifecycle!(FakeModule);

impl Producer for FakeModule {
    fn produce(&mut self, event: &mut Event<'_>) -> Result<(), ModuleError> {
        self.record("event");
        self.next_behavior()?;
        event.put(event.id().event)
    }
}

impl Filter for FakeModule {
    fn filter(&mut self, _: &mut Event<'_>) -> Result<bool, ModuleError> {
        self.record("event");
        self.next_behavior()
    }
}

impl Analyzer for FakeModule {
    fn analyze(&mut self, _: &Event<'_>) -> Result<(), ModuleError> {
        self.record("event");
        self.next_behavior().map(|_| ())
    }
}

/// A fake output module that records what it was asked to write.
pub struct FakeOutput {
    label: String,
    log: CallLog,
    fail_callbacks: Vec<(String, ModuleError)>,
}

impl FakeOutput {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
            fail_callbacks: Vec::new(),
        }
    }

    pub fn fail_callback(mut self, callback: &str, error: ModuleError) -> Self {
        self.fail_callbacks.push((callback.to_string(), error));
        self
    }

    pub fn into_module(self) -> Module {
        Module::output(self)
    }

    fn record(&self, call: &str) {
        self.log.push(&self.label, call);
    }

    fn fail_on(&self, callback: &str) -> Result<(), ModuleError> {
        match self.fail_callbacks.iter().find(|(c, _)| c == callback) {
            Some((_, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

recording_lifecycle!(FakeOutput);

impl OutputModule for FakeOutput {
    fn write(&mut self, event: &Event<'_>) -> Result<(), ModuleError> {
        self.record(&format!("write({})", event.id().event));
        self.fail_on("write")
    }

    fn write_run(&mut self, run: &RunPrincipal) -> Result<(), ModuleError> {
        self.record(&format!("write_run({})", run.run));
        Ok(())
    }

    fn write_lumi(&mut self, lumi: &LumiPrincipal) -> Result<(), ModuleError> {
        self.record(&format!("write_lumi({}.{})", lumi.run, lumi.lumi));
        Ok(())
    }

    fn open_file(&mut self, _: &FileBlock) -> Result<(), ModuleError> {
        self.record("open_file");
        Ok(())
    }

    fn close_file(&mut self) -> Result<(), ModuleError> {
        self.record("close_file");
        Ok(())
    }
}

/// Producer that fetches another label's product before putting its own.
pub struct Consumer {
    label: String,
    wants: String,
    log: CallLog,
}

impl Consumer {
    pub fn new(label: &str, wants: &str, log: &CallLog) -> Module {
        Module::producer(Self {
            label: label.to_string(),
            wants: wants.to_string(),
            log: log.clone(),
        })
    }
}

impl Lifecycle for Consumer {}

impl Producer for Consumer {
    fn produce(&mut self, event: &mut Event<'_>) -> Result<(), ModuleError> {
        self.log.push(&self.label, "event");
        let value = event.get::<u64>(&self.wants)?;
        event.put(*value + 1)
    }
}

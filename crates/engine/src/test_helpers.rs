// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::observer::{Observer, Observers};
use crate::worker::{Context, Worker};
use evs_config::{parse_config, ProcessConfig};
use evs_core::{Conditions, EventId, EventPrincipal, FakeClock, Module, ModuleDescription};
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) fn no_observers() -> Observers {
    Arc::new(Vec::new())
}

/// A worker whose description matches the module's kind.
pub(crate) fn worker(label: &str, module: Module) -> Worker {
    let kind = module.kind();
    Worker::new(
        ModuleDescription::new(label, format!("Fake{}", kind), kind),
        module,
        no_observers(),
    )
}

pub(crate) fn cx<'a>(clock: &'a FakeClock, conditions: &'a Conditions) -> Context<'a, FakeClock> {
    Context {
        conditions,
        clock,
        resolver: None,
    }
}

pub(crate) fn event(n: u64) -> EventPrincipal {
    EventPrincipal::new(EventId::new(1, 1, n))
}

pub(crate) fn config(toml: &str) -> ProcessConfig {
    parse_config(toml).unwrap()
}

/// Observer that records notifications as strings.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub seen: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl Observer for RecordingObserver {
    fn module_constructed(&self, description: &ModuleDescription) {
        self.seen
            .lock()
            .push(format!("constructed:{}", description.label));
    }

    fn pre_module(&self, description: &ModuleDescription, stage: &'static str) {
        self.seen
            .lock()
            .push(format!("pre:{}:{}", description.label, stage));
    }

    fn post_module(&self, description: &ModuleDescription, stage: &'static str, ok: bool) {
        self.seen
            .lock()
            .push(format!("post:{}:{}:{}", description.label, stage, ok));
    }

    fn pre_event(&self, id: EventId) {
        self.seen.lock().push(format!("pre_event:{}", id.event));
    }

    fn post_event(&self, id: EventId, accepted: bool) {
        self.seen
            .lock()
            .push(format!("post_event:{}:{}", id.event, accepted));
    }

    fn post_begin_job(&self) {
        self.seen.lock().push("post_begin_job".to_string());
    }

    fn post_end_job(&self) {
        self.seen.lock().push("post_end_job".to_string());
    }
}

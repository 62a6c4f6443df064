// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-demand workers
//!
//! Producers and filters that are configured but on no path run only when
//! another module asks for their product. Each worker sits in its own
//! `RefCell`; a request that finds the cell already borrowed is a cycle.

use crate::error::WorkerError;
use crate::worker::{Context, Worker};
use evs_core::{Clock, Conditions, EventPrincipal, ModuleError, Occurrence, ProductResolver};
use indexmap::IndexMap;
use std::cell::RefCell;

/// Registry of on-demand workers keyed by label.
#[derive(Debug, Default)]
pub struct Unscheduled {
    workers: IndexMap<String, RefCell<Worker>>,
}

impl Unscheduled {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, worker: Worker) {
        let label = worker.description().label.to_string();
        self.workers.insert(label, RefCell::new(worker));
    }

    pub fn contains(&self, label: &str) -> bool {
        self.workers.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> impl Iterator<Item = &RefCell<Worker>> {
        self.workers.values()
    }

    pub fn workers_mut(&mut self) -> impl Iterator<Item = &mut Worker> {
        self.workers.values_mut().map(RefCell::get_mut)
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut Worker> {
        self.workers.get_mut(label).map(RefCell::get_mut)
    }

    pub fn reset(&mut self) {
        for worker in self.workers_mut() {
            worker.reset();
        }
    }

    /// Run a non-event occurrence on every on-demand worker.
    pub fn run_transition<C: Clock>(
        &mut self,
        occurrence: Occurrence<'_>,
        cx: &Context<'_, C>,
    ) -> Result<(), WorkerError> {
        for worker in self.workers_mut() {
            worker.reset();
            worker.run(occurrence, cx)?;
        }
        Ok(())
    }

    /// A resolver for one event, used by `Event::get`.
    pub fn resolver<'a, C: Clock>(&'a self, clock: &'a C) -> OnDemand<'a, C> {
        OnDemand {
            registry: self,
            clock,
        }
    }
}

/// Runs on-demand workers when their product is requested.
pub struct OnDemand<'a, C: Clock> {
    registry: &'a Unscheduled,
    clock: &'a C,
}

impl<C: Clock> ProductResolver for OnDemand<'_, C> {
    fn resolve(
        &self,
        label: &str,
        event: &EventPrincipal,
        conditions: &Conditions,
    ) -> Result<bool, ModuleError> {
        let Some(cell) = self.registry.workers.get(label) else {
            return Ok(false);
        };
        let mut worker = cell.try_borrow_mut().map_err(|_| {
            ModuleError::new(
                "CircularDependency",
                format!("on-demand module '{label}' requested a product it is producing"),
            )
        })?;
        tracing::debug!(label, event = %event.id, "running on demand");
        let cx = Context {
            conditions,
            clock: self.clock,
            resolver: Some(self as &dyn ProductResolver),
        };
        worker
            .run(Occurrence::Event(event), &cx)
            .map(|_| true)
            .map_err(|err| err.to_module_error())
    }
}

#[cfg(test)]
#[path = "unscheduled_tests.rs"]
mod tests;

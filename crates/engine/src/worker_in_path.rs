// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A worker's slot on one path

use crate::error::WorkerError;
use crate::worker::{Context, Worker, WorkerId};
use evs_config::FilterAction;
use evs_core::{Clock, Occurrence, Stopwatch, Timing};
use serde::{Deserialize, Serialize};

/// Path-local counters, event phase only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathWorkerCounters {
    pub times_visited: u64,
    pub times_passed: u64,
    pub times_failed: u64,
    pub times_except: u64,
}

/// A worker reference plus the filter action this path applies to it.
#[derive(Debug, Clone)]
pub struct WorkerInPath {
    worker: WorkerId,
    action: FilterAction,
    counters: PathWorkerCounters,
    timing: Timing,
}

impl WorkerInPath {
    pub fn new(worker: WorkerId, action: FilterAction) -> Self {
        Self {
            worker,
            action,
            counters: PathWorkerCounters::default(),
            timing: Timing::default(),
        }
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn action(&self) -> FilterAction {
        self.action
    }

    pub(crate) fn set_action(&mut self, action: FilterAction) {
        self.action = action;
    }

    pub fn counters(&self) -> PathWorkerCounters {
        self.counters
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn clear_counters(&mut self) {
        self.counters = PathWorkerCounters::default();
        self.timing = Timing::default();
    }

    /// Run the worker and apply the filter action to its decision.
    pub fn run<C: Clock>(
        &mut self,
        worker: &mut Worker,
        occurrence: Occurrence<'_>,
        cx: &Context<'_, C>,
    ) -> Result<bool, WorkerError> {
        let is_event = occurrence.is_event();
        if is_event {
            self.counters.times_visited += 1;
        }

        let watch = Stopwatch::start(cx.clock);
        let result = worker.run(occurrence, cx);
        if is_event {
            self.timing.add(watch.stop());
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                if is_event {
                    self.counters.times_except += 1;
                }
                return Err(err);
            }
        };
        if !is_event {
            return Ok(true);
        }

        let pass = self.action.apply(raw);
        if pass {
            self.counters.times_passed += 1;
        } else {
            self.counters.times_failed += 1;
        }
        Ok(pass)
    }
}

#[cfg(test)]
#[path = "worker_in_path_tests.rs"]
mod tests;

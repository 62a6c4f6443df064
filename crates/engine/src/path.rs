// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paths: ordered workers that together produce one trigger bit

use crate::error::PathError;
use crate::worker::{Context, Worker};
use crate::worker_in_path::WorkerInPath;
use evs_core::{Clock, Occurrence, PathName, PathStatus, SharedTriggerBits, Stopwatch, Timing};
use serde::{Deserialize, Serialize};

/// Event-phase counters of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathCounters {
    pub times_run: u64,
    pub times_passed: u64,
    pub times_failed: u64,
    pub times_except: u64,
}

/// A trigger path or end path.
#[derive(Debug)]
pub struct Path {
    name: PathName,
    bit: usize,
    end_path: bool,
    workers: Vec<WorkerInPath>,
    bits: SharedTriggerBits,
    counters: PathCounters,
    timing: Timing,
}

impl Path {
    pub fn new(
        name: impl Into<PathName>,
        bit: usize,
        end_path: bool,
        workers: Vec<WorkerInPath>,
        bits: SharedTriggerBits,
    ) -> Self {
        Self {
            name: name.into(),
            bit,
            end_path,
            workers,
            bits,
            counters: PathCounters::default(),
            timing: Timing::default(),
        }
    }

    pub fn name(&self) -> &PathName {
        &self.name
    }

    pub fn bit(&self) -> usize {
        self.bit
    }

    pub fn is_end_path(&self) -> bool {
        self.end_path
    }

    pub fn workers(&self) -> &[WorkerInPath] {
        &self.workers
    }

    pub(crate) fn workers_mut(&mut self) -> &mut [WorkerInPath] {
        &mut self.workers
    }

    pub fn counters(&self) -> PathCounters {
        self.counters
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn clear_counters(&mut self) {
        self.counters = PathCounters::default();
        self.timing = Timing::default();
        for wip in &mut self.workers {
            wip.clear_counters();
        }
    }

    /// Run the path's workers in order against the schedule's worker table.
    ///
    /// At event phase the first `false` stops the path and the outcome is
    /// written to the path's trigger bit.
    pub fn run<C: Clock>(
        &mut self,
        workers: &mut [Worker],
        occurrence: Occurrence<'_>,
        cx: &Context<'_, C>,
    ) -> Result<bool, PathError> {
        let is_event = occurrence.is_event();
        if is_event {
            self.counters.times_run += 1;
        }

        let watch = Stopwatch::start(cx.clock);
        let mut pass = true;
        let mut failure = None;
        for wip in &mut self.workers {
            let worker = &mut workers[wip.worker().0];
            match wip.run(worker, occurrence, cx) {
                Ok(true) => {}
                Ok(false) => {
                    pass = false;
                    break;
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        if is_event {
            self.timing.add(watch.stop());
        }

        if let Some(source) = failure {
            if is_event {
                self.bits.lock().set(self.bit, PathStatus::Exception);
                self.counters.times_except += 1;
            }
            tracing::error!(path = %self.name, label = %source.label, "path failed");
            return Err(PathError {
                path: self.name.clone(),
                source,
            });
        }

        if is_event {
            let status = if pass {
                self.counters.times_passed += 1;
                PathStatus::Pass
            } else {
                self.counters.times_failed += 1;
                PathStatus::Fail
            };
            self.bits.lock().set(self.bit, status);
        }
        Ok(pass)
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! evs-engine: workers, paths and the schedule that runs them
//!
//! A [`Schedule`] is assembled from a [`evs_config::ProcessConfig`] and one
//! module instance per label. An [`EventProcessor`] feeds it from an
//! [`InputSource`], following the job phases of [`evs_core::JobMachine`].

mod error;
mod inserter;
mod looper;
mod observer;
mod path;
mod processor;
mod registry;
mod report;
mod schedule;
mod source;
mod unscheduled;
mod worker;
mod worker_in_path;

#[cfg(test)]
mod test_helpers;

pub use error::{
    ConfigError, Failure, PathError, ProcessError, ScheduleError, SourceError, WorkerError,
};
pub use inserter::{TriggerResultInserter, TRIGGER_RESULTS_LABEL};
pub use looper::{CountingLooper, Looper};
pub use observer::{Observer, Observers, TracingObserver};
pub use path::{Path, PathCounters};
pub use processor::{EventProcessor, RunStatus};
pub use registry::{ModuleFactory, ModuleRegistry};
pub use report::{EventSummary, ModuleInPathSummary, PathSummary, TriggerReport, WorkerSummary};
pub use schedule::Schedule;
pub use source::{InputSource, ItemType, MockSource};
pub use unscheduled::{OnDemand, Unscheduled};
pub use worker::{Context, OutputControl, Worker, WorkerCounters, WorkerId, WorkerState};
pub use worker_in_path::{PathWorkerCounters, WorkerInPath};

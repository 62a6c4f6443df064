// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger and timing summary of a schedule

use evs_config::FilterAction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read-only snapshot of a schedule's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerReport {
    pub event_summary: EventSummary,
    pub trigger_paths: Vec<PathSummary>,
    pub end_paths: Vec<PathSummary>,
    pub workers: Vec<WorkerSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub total_events: u64,
    pub total_passed: u64,
    pub total_failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSummary {
    pub name: String,
    pub bit_position: usize,
    pub times_run: u64,
    pub times_passed: u64,
    pub times_failed: u64,
    pub times_except: u64,
    pub modules: Vec<ModuleInPathSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInPathSummary {
    pub label: String,
    pub action: FilterAction,
    pub times_visited: u64,
    pub times_passed: u64,
    pub times_failed: u64,
    pub times_except: u64,
}

/// Per-module counters; times are totals in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub label: String,
    pub type_name: String,
    pub times_visited: u64,
    pub times_run: u64,
    pub times_passed: u64,
    pub times_failed: u64,
    pub times_except: u64,
    pub cpu_time: f64,
    pub real_time: f64,
}

impl TriggerReport {
    pub fn path(&self, name: &str) -> Option<&PathSummary> {
        self.trigger_paths
            .iter()
            .chain(&self.end_paths)
            .find(|p| p.name == name)
    }

    pub fn worker(&self, label: &str) -> Option<&WorkerSummary> {
        self.workers.iter().find(|w| w.label == label)
    }
}

const PREFIX: &str = "TrigReport";

fn path_table(f: &mut fmt::Formatter<'_>, title: &str, paths: &[PathSummary]) -> fmt::Result {
    writeln!(f, "{} ---------- {} ------------", PREFIX, title)?;
    writeln!(
        f,
        "{}  Trig Bit#        Run     Passed     Failed      Error Name",
        PREFIX
    )?;
    for p in paths {
        writeln!(
            f,
            "{}  {:>9} {:>10} {:>10} {:>10} {:>10} {}",
            PREFIX, p.bit_position, p.times_run, p.times_passed, p.times_failed, p.times_except,
            p.name
        )?;
    }
    writeln!(f)
}

fn modules_table(f: &mut fmt::Formatter<'_>, kind: &str, path: &PathSummary) -> fmt::Result {
    writeln!(
        f,
        "{} ---------- Modules in {}: {} ------------",
        PREFIX, kind, path.name
    )?;
    writeln!(
        f,
        "{}  Trig Bit#    Visited     Passed     Failed      Error Name",
        PREFIX
    )?;
    for m in &path.modules {
        writeln!(
            f,
            "{}  {:>9} {:>10} {:>10} {:>10} {:>10} {}{}",
            PREFIX,
            path.bit_position,
            m.times_visited,
            m.times_passed,
            m.times_failed,
            m.times_except,
            m.action.prefix(),
            m.label
        )?;
    }
    writeln!(f)
}

/// The classic text summary.
impl fmt::Display for TriggerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.event_summary;
        writeln!(f, "{} ---------- Event  Summary ------------", PREFIX)?;
        writeln!(
            f,
            "{} Events total = {} passed = {} failed = {}",
            PREFIX, e.total_events, e.total_passed, e.total_failed
        )?;
        writeln!(f)?;

        path_table(f, "Path   Summary", &self.trigger_paths)?;
        path_table(f, "End-Path   Summary", &self.end_paths)?;
        for path in &self.trigger_paths {
            modules_table(f, "Path", path)?;
        }
        for path in &self.end_paths {
            modules_table(f, "End-Path", path)?;
        }

        writeln!(f, "{} ---------- Module Summary ------------", PREFIX)?;
        writeln!(
            f,
            "{}    Visited        Run     Passed     Failed      Error Name",
            PREFIX
        )?;
        for w in &self.workers {
            writeln!(
                f,
                "{} {:>10} {:>10} {:>10} {:>10} {:>10} {}",
                PREFIX, w.times_visited, w.times_run, w.times_passed, w.times_failed,
                w.times_except, w.label
            )?;
        }
        writeln!(f)?;

        writeln!(f, "TimeReport ---------- Module Summary ---[sec]----")?;
        writeln!(f, "TimeReport   CPU/event  Real/event Name")?;
        let events = e.total_events.max(1) as f64;
        for w in &self.workers {
            writeln!(
                f,
                "TimeReport {:>11.6} {:>11.6} {}",
                w.cpu_time / events,
                w.real_time / events,
                w.label
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clocks and module timing

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of wall-clock and CPU time.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;

    /// CPU time consumed by the current thread so far.
    fn cpu_time(&self) -> Duration;
}

/// Real clock. CPU time is read from the scheduler statistics of the
/// current thread where the platform exposes them, and is zero elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn cpu_time(&self) -> Duration {
        thread_cpu_time().unwrap_or_default()
    }
}

fn thread_cpu_time() -> Option<Duration> {
    let stat = std::fs::read_to_string("/proc/thread-self/schedstat").ok()?;
    let nanos = stat.split_whitespace().next()?.parse::<u64>().ok()?;
    Some(Duration::from_nanos(nanos))
}

/// Manually advanced clock for tests.
#[derive(Clone, Debug)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

#[derive(Debug)]
struct FakeClockState {
    now: Instant,
    cpu: Duration,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now: Instant::now(),
                cpu: Duration::ZERO,
            })),
        }
    }

    /// Advance wall time and CPU time by the same amount.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock();
        state.now += duration;
        state.cpu += duration;
    }

    pub fn advance_wall(&self, duration: Duration) {
        self.inner.lock().now += duration;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn cpu_time(&self) -> Duration {
        self.inner.lock().cpu
    }
}

/// Accumulated CPU and real time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub cpu: Duration,
    pub real: Duration,
}

impl Timing {
    pub fn add(&mut self, other: Timing) {
        self.cpu += other.cpu;
        self.real += other.real;
    }
}

/// Measures one interval on a clock.
pub struct Stopwatch<'a, C: Clock> {
    clock: &'a C,
    real_start: Instant,
    cpu_start: Duration,
}

impl<'a, C: Clock> Stopwatch<'a, C> {
    pub fn start(clock: &'a C) -> Self {
        Self {
            clock,
            real_start: clock.now(),
            cpu_start: clock.cpu_time(),
        }
    }

    pub fn stop(self) -> Timing {
        Timing {
            cpu: self.clock.cpu_time().saturating_sub(self.cpu_start),
            real: self.clock.now().saturating_duration_since(self.real_start),
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;

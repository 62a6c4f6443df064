// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-path trigger status bits

use crate::id::PathName;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Status of one path for the current event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    #[default]
    Ready,
    Pass,
    Fail,
    Exception,
}

/// One status slot per path, in bit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerBits {
    slots: Vec<PathStatus>,
}

/// Trigger bits shared between a schedule and the paths writing into them.
pub type SharedTriggerBits = Arc<Mutex<TriggerBits>>;

impl TriggerBits {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![PathStatus::Ready; size],
        }
    }

    pub fn shared(size: usize) -> SharedTriggerBits {
        Arc::new(Mutex::new(Self::new(size)))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, bit: usize) -> Option<PathStatus> {
        self.slots.get(bit).copied()
    }

    /// Out-of-range positions are ignored.
    pub fn set(&mut self, bit: usize, status: PathStatus) {
        if let Some(slot) = self.slots.get_mut(bit) {
            *slot = status;
        }
    }

    pub fn reset(&mut self) {
        self.slots.fill(PathStatus::Ready);
    }

    pub fn passed(&self, bit: usize) -> bool {
        self.get(bit) == Some(PathStatus::Pass)
    }

    /// True when any path passed, or there are no paths at all.
    pub fn accept(&self) -> bool {
        self.slots.is_empty() || self.slots.contains(&PathStatus::Pass)
    }

    pub fn iter(&self) -> impl Iterator<Item = PathStatus> + '_ {
        self.slots.iter().copied()
    }
}

/// Snapshot of the trigger bits stored into each event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResults {
    pub names: Vec<PathName>,
    pub bits: TriggerBits,
}

impl TriggerResults {
    pub fn accept(&self) -> bool {
        self.bits.accept()
    }

    /// Whether the named path passed.
    pub fn accepted(&self, path: &str) -> bool {
        self.names
            .iter()
            .position(|n| n == path)
            .is_some_and(|bit| self.bits.passed(bit))
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observers notified around module calls and events
//!
//! Observers are handed to the schedule at construction and shared by
//! every worker.

use evs_core::{EventId, ModuleDescription};
use std::sync::Arc;

/// Hooks around module activity. All methods default to no-ops.
#[allow(unused_variables)]
pub trait Observer: Send + Sync {
    fn module_constructed(&self, description: &ModuleDescription) {}

    fn pre_module(&self, description: &ModuleDescription, stage: &'static str) {}

    fn post_module(&self, description: &ModuleDescription, stage: &'static str, ok: bool) {}

    fn pre_event(&self, id: EventId) {}

    fn post_event(&self, id: EventId, accepted: bool) {}

    fn post_begin_job(&self) {}

    fn post_end_job(&self) {}
}

/// Observers shared by a schedule and its workers.
pub type Observers = Arc<Vec<Arc<dyn Observer>>>;

/// Logs module activity with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn module_constructed(&self, description: &ModuleDescription) {
        tracing::debug!(
            label = %description.label,
            type_name = %description.type_name,
            kind = %description.kind,
            "module constructed"
        );
    }

    fn pre_module(&self, description: &ModuleDescription, stage: &'static str) {
        tracing::trace!(label = %description.label, stage, "module start");
    }

    fn post_module(&self, description: &ModuleDescription, stage: &'static str, ok: bool) {
        tracing::trace!(label = %description.label, stage, ok, "module done");
    }

    fn pre_event(&self, id: EventId) {
        tracing::debug!(%id, "event start");
    }

    fn post_event(&self, id: EventId, accepted: bool) {
        tracing::debug!(%id, accepted, "event done");
    }
}

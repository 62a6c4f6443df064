// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Puts the trigger results into every event

use evs_core::{
    Event, Lifecycle, ModuleError, PathName, Producer, SharedTriggerBits, TriggerResults,
};

/// Label under which the trigger results are stored.
pub const TRIGGER_RESULTS_LABEL: &str = "TriggerResults";

pub(crate) const INSERTER_TYPE: &str = "TriggerResultInserter";

/// Snapshots the trigger bits after the trigger paths have run.
pub struct TriggerResultInserter {
    names: Vec<PathName>,
    bits: SharedTriggerBits,
}

impl TriggerResultInserter {
    pub fn new(names: Vec<PathName>, bits: SharedTriggerBits) -> Self {
        Self { names, bits }
    }
}

impl Lifecycle for TriggerResultInserter {}

impl Producer for TriggerResultInserter {
    fn produce(&mut self, event: &mut Event<'_>) -> Result<(), ModuleError> {
        let bits = self.bits.lock().clone();
        event.put(TriggerResults {
            names: self.names.clone(),
            bits,
        })
    }
}

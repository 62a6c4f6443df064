// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(feature = "test-support", allow(clippy::panic))]

//! evs-core: records, module interface and job phase machine for the evsched
//! event processing engine

pub mod clock;
pub mod effect;
pub mod id;
pub mod machine;
pub mod module;
pub mod principal;
pub mod trigger;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, Stopwatch, SystemClock, Timing};
pub use effect::Effect;
pub use id::{EventId, LumiNumber, ModuleLabel, PathName, RunNumber};
pub use machine::{
    FileMode, FileState, JobEvent, JobMachine, JobState, LumiState, MachineConfig, RunState,
};
pub use module::{
    Analyzer, Event, FileTransition, Filter, Lifecycle, Module, ModuleDescription, ModuleError,
    ModuleKind, Occurrence, OutputModule, Phase, Producer, ProductResolver,
};
pub use principal::{
    Conditions, EventPrincipal, FileBlock, LumiPrincipal, Product, ProductKey, RunPrincipal,
};
pub use trigger::{PathStatus, SharedTriggerBits, TriggerBits, TriggerResults};

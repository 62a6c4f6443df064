// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{cx, event, worker, RecordingObserver};
use evs_core::test_support::{Behavior, CallLog, FakeModule, FakeOutput};
use evs_core::{FakeClock, ModuleKind, PathStatus, RunPrincipal, TriggerBits};
use std::sync::Arc;
use std::time::Duration;

fn raised(category: &str) -> Behavior {
    Behavior::Fail(ModuleError::new(category, "boom"))
}

#[test]
fn runs_module_once_per_event() {
    let log = CallLog::new();
    let mut w = worker("a", FakeModule::new("a", &log).into_producer());
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let principal = event(1);

    assert!(w.run(Occurrence::Event(&principal), &ctx).unwrap());
    assert!(w.run(Occurrence::Event(&principal), &ctx).unwrap());

    assert_eq!(log.count("a", "event"), 1);
    let counters = w.counters();
    assert_eq!(counters.times_visited, 2);
    assert_eq!(counters.times_run, 1);
    assert_eq!(counters.times_passed, 1);
}

#[test]
fn reset_allows_the_next_event_to_run() {
    let log = CallLog::new();
    let mut w = worker("a", FakeModule::new("a", &log).into_producer());
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);

    for n in 1..=3 {
        w.reset();
        let principal = event(n);
        w.run(Occurrence::Event(&principal), &ctx).unwrap();
    }
    assert_eq!(log.count("a", "event"), 3);
    assert_eq!(w.counters().times_run, 3);
}

#[test]
fn filter_rejection_is_memoized() {
    let log = CallLog::new();
    let mut w = worker(
        "f",
        FakeModule::new("f", &log).always(Behavior::Reject)
            .into_filter(),
    );
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let principal = event(1);

    assert!(!w.run(Occurrence::Event(&principal), &ctx).unwrap());
    assert!(!w.run(Occurrence::Event(&principal), &ctx).unwrap());
    assert_eq!(w.state(), WorkerState::Fail);
    assert_eq!(w.counters().times_failed, 1);
    assert_eq!(log.count("f", "event"), 1);
}

#[test]
fn failure_is_cached_and_replayed() {
    let log = CallLog::new();
    let mut w = worker(
        "f",
        FakeModule::new("f", &log)
            .always(raised("Bad"))
            .into_filter(),
    );
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let principal = event(1);

    let first = w.run(Occurrence::Event(&principal), &ctx).unwrap_err();
    let second = w.run(Occurrence::Event(&principal), &ctx).unwrap_err();

    assert_eq!(first, second);
    assert_eq!(first.category(), "Bad");
    assert_eq!(first.stage, "event");
    assert_eq!(w.state(), WorkerState::Exception);
    assert_eq!(w.counters().times_except, 1);
    assert_eq!(log.count("f", "event"), 1);
}

#[test]
fn panics_are_contained() {
    let log = CallLog::new();
    let mut w = worker(
        "p",
        FakeModule::new("p", &log)
            .always(Behavior::Panic("kaboom".into()))
            .into_producer(),
    );
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let principal = event(1);

    let err = w.run(Occurrence::Event(&principal), &ctx).unwrap_err();
    assert_eq!(err.failure, Failure::Panicked("kaboom".into()));
    assert_eq!(err.label, "p");
    assert_eq!(w.counters().times_except, 1);
}

struct PutsTwice;

impl evs_core::Lifecycle for PutsTwice {}

impl evs_core::Producer for PutsTwice {
    fn produce(&mut self, event: &mut evs_core::Event<'_>) -> Result<(), ModuleError> {
        event.put(1_u32)?;
        event.put(2_u32)
    }
}

#[test]
fn duplicate_put_fails_the_producer() {
    let mut w = worker("twice", Module::producer(PutsTwice));
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let principal = event(1);

    let err = w.run(Occurrence::Event(&principal), &ctx).unwrap_err();

    assert_eq!(err.category(), "ProductAlreadyPut");
    assert_eq!(w.state(), WorkerState::Exception);
}

#[test]
fn counters_balance_over_mixed_outcomes() {
    let log = CallLog::new();
    let mut w = worker(
        "f",
        FakeModule::new("f", &log)
            .then(Behavior::Pass)
            .then(Behavior::Reject)
            .then(raised("X"))
            .then(Behavior::Pass)
            .into_filter(),
    );
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    for n in 1..=4 {
        w.reset();
        let principal = event(n);
        let _ = w.run(Occurrence::Event(&principal), &ctx);
    }
    let c = w.counters();
    assert_eq!(c.times_run, 4);
    assert_eq!(c.times_passed, 2);
    assert_eq!(c.times_failed, 1);
    assert_eq!(c.times_except, 1);
    assert_eq!(
        c.times_run,
        c.times_passed + c.times_failed + c.times_except
    );
}

#[test]
fn transitions_do_not_touch_counters() {
    let log = CallLog::new();
    let mut w = worker("a", FakeModule::new("a", &log).into_analyzer());
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let run = RunPrincipal::new(1);

    assert!(w.run(Occurrence::BeginRun(&run), &ctx).unwrap());
    assert_eq!(log.calls_for("a"), vec!["begin_run(1)"]);
    assert_eq!(w.counters(), WorkerCounters::default());
}

#[test]
fn transition_failure_names_the_stage() {
    let log = CallLog::new();
    let mut w = worker(
        "a",
        FakeModule::new("a", &log)
            .fail_callback("end_run", ModuleError::new("Run", "bad run"))
            .into_analyzer(),
    );
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let run = RunPrincipal::new(7);

    let err = w.run(Occurrence::EndRun(&run), &ctx).unwrap_err();
    assert_eq!(err.stage, "end_run");
    assert_eq!(err.category(), "Run");
}

#[test]
fn event_time_is_accumulated() {
    let log = CallLog::new();
    let mut w = worker("a", FakeModule::new("a", &log).into_producer());
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let principal = event(1);

    // Time spent outside the module is not charged to it.
    clock.advance(Duration::from_millis(5));
    w.run(Occurrence::Event(&principal), &ctx).unwrap();
    assert_eq!(w.timing(), Timing::default());

    w.clear_counters();
    assert_eq!(w.counters(), WorkerCounters::default());
}

#[test]
fn end_job_runs_once() {
    let log = CallLog::new();
    let mut w = worker("a", FakeModule::new("a", &log).into_producer());
    w.begin_job(&Conditions::none()).unwrap();
    w.begin_job(&Conditions::none()).unwrap();
    w.end_job().unwrap();
    w.end_job().unwrap();
    assert_eq!(log.calls_for("a"), vec!["begin_job", "end_job"]);
}

#[test]
fn replace_module_begins_the_new_job() {
    let log = CallLog::new();
    let mut w = worker("a", FakeModule::new("a", &log).into_producer());
    w.begin_job(&Conditions::none()).unwrap();
    let replacement = FakeModule::new("b", &log).into_producer();
    w.replace_module(replacement, &Conditions::none()).unwrap();
    assert_eq!(log.calls(), vec!["a:begin_job", "b:begin_job"]);
}

#[test]
fn output_respects_write_limit() {
    let log = CallLog::new();
    let bits = TriggerBits::shared(1);
    let mut w = worker("out", FakeOutput::new("out", &log).into_module())
        .with_output_control(OutputControl::new(Some(2), vec![], bits));
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);

    for n in 1..=3 {
        w.reset();
        let principal = event(n);
        w.run(Occurrence::Event(&principal), &ctx).unwrap();
    }
    assert_eq!(log.calls_for("out"), vec!["write(1)", "write(2)"]);
    assert!(w.limit_reached());
}

#[test]
fn output_writes_only_selected_events() {
    let log = CallLog::new();
    let bits = TriggerBits::shared(2);
    let mut w = worker("out", FakeOutput::new("out", &log).into_module())
        .with_output_control(OutputControl::new(None, vec![1], Arc::clone(&bits)));
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);

    bits.lock().set(0, PathStatus::Pass);
    bits.lock().set(1, PathStatus::Fail);
    let principal = event(1);
    w.run(Occurrence::Event(&principal), &ctx).unwrap();

    w.reset();
    bits.lock().set(1, PathStatus::Pass);
    let principal = event(2);
    w.run(Occurrence::Event(&principal), &ctx).unwrap();

    assert_eq!(log.calls_for("out"), vec!["write(2)"]);
    assert!(!w.limit_reached());
}

#[test]
fn observers_see_module_calls() {
    let log = CallLog::new();
    let recorder = Arc::new(RecordingObserver::default());
    let observers: crate::Observers = Arc::new(vec![recorder.clone() as Arc<dyn crate::Observer>]);
    let mut w = Worker::new(
        ModuleDescription::new("a", "FakeProducer", ModuleKind::Producer),
        FakeModule::new("a", &log).into_producer(),
        observers,
    );
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let ctx = cx(&clock, &conditions);
    let principal = event(1);
    w.run(Occurrence::Event(&principal), &ctx).unwrap();

    assert_eq!(
        recorder.seen(),
        vec!["constructed:a", "pre:a:event", "post:a:event:true"]
    );
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{event, worker};
use evs_core::test_support::{CallLog, Consumer, FakeModule};
use evs_core::{Event, FakeClock, ModuleLabel};

fn registry(modules: Vec<(&str, evs_core::Module)>) -> Unscheduled {
    let mut registry = Unscheduled::new();
    for (label, module) in modules {
        registry.insert(worker(label, module));
    }
    registry
}

#[test]
fn unknown_label_is_not_resolved() {
    let registry = Unscheduled::new();
    let clock = FakeClock::new();
    let principal = event(1);
    let resolved = registry
        .resolver(&clock)
        .resolve("nope", &principal, &Conditions::none())
        .unwrap();
    assert!(!resolved);
}

#[test]
fn product_is_made_on_first_request() {
    let log = CallLog::new();
    let registry = registry(vec![("a", FakeModule::new("a", &log).into_producer())]);
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let principal = event(7);
    let resolver = registry.resolver(&clock);
    let label = ModuleLabel::new("reader");
    let reader = Event::new(&principal, &label, &conditions, Some(&resolver));

    assert_eq!(*reader.get::<u64>("a").unwrap(), 7);
    assert_eq!(*reader.get::<u64>("a").unwrap(), 7);
    assert_eq!(log.count("a", "event"), 1);
}

#[test]
fn chains_resolve_transitively() {
    let log = CallLog::new();
    let registry = registry(vec![
        ("a", FakeModule::new("a", &log).into_producer()),
        ("b", Consumer::new("b", "a", &log)),
    ]);
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let principal = event(3);
    let resolver = registry.resolver(&clock);
    let label = ModuleLabel::new("reader");
    let reader = Event::new(&principal, &label, &conditions, Some(&resolver));

    assert_eq!(*reader.get::<u64>("b").unwrap(), 4);
    assert_eq!(log.calls(), vec!["b:event", "a:event"]);
}

#[test]
fn cycles_fail_instead_of_recursing() {
    let log = CallLog::new();
    let registry = registry(vec![
        ("a", Consumer::new("a", "b", &log)),
        ("b", Consumer::new("b", "a", &log)),
    ]);
    let clock = FakeClock::new();
    let conditions = Conditions::none();
    let principal = event(1);
    let resolver = registry.resolver(&clock);
    let label = ModuleLabel::new("reader");
    let reader = Event::new(&principal, &label, &conditions, Some(&resolver));

    let err = reader.get::<u64>("a").unwrap_err();
    assert_eq!(err.category, "CircularDependency");
    assert_eq!(log.calls(), vec!["a:event", "b:event"]);
}

#[test]
fn reset_lets_the_worker_run_for_the_next_event() {
    let log = CallLog::new();
    let mut registry = registry(vec![("a", FakeModule::new("a", &log).into_producer())]);
    let clock = FakeClock::new();
    let conditions = Conditions::none();

    for n in 1..=2 {
        registry.reset();
        let principal = event(n);
        let resolver = registry.resolver(&clock);
        resolver.resolve("a", &principal, &conditions).unwrap();
    }
    assert_eq!(log.count("a", "event"), 2);
    assert_eq!(registry.len(), 1);
    assert!(registry.contains("a"));
}

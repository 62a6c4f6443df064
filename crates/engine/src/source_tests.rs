// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn drain(source: &mut MockSource) -> Vec<ItemType> {
    let mut items = Vec::new();
    loop {
        let item = source.next_item_type().unwrap();
        items.push(item);
        if item == ItemType::Stop {
            return items;
        }
    }
}

#[test]
fn script_yields_items_in_order() {
    let mut source = MockSource::parse("f r 1 l 1 e e s").unwrap();
    assert_eq!(source.len(), 6);
    assert_eq!(
        drain(&mut source),
        vec![
            ItemType::File,
            ItemType::Run,
            ItemType::Lumi,
            ItemType::Event,
            ItemType::Event,
            ItemType::Stop,
        ]
    );
    // Stop is sticky.
    assert_eq!(source.next_item_type().unwrap(), ItemType::Stop);
}

#[test]
fn end_of_script_stops() {
    let mut source = MockSource::parse("f").unwrap();
    assert_eq!(drain(&mut source), vec![ItemType::File, ItemType::Stop]);

    let mut empty = MockSource::parse("   ").unwrap();
    assert!(empty.is_empty());
    assert_eq!(drain(&mut empty), vec![ItemType::Stop]);
}

#[test]
fn records_follow_the_current_item() {
    let mut source = MockSource::parse("f r 3 l 2 e e").unwrap();

    source.next_item_type().unwrap();
    assert_eq!(source.read_file().unwrap().name, "mock:1");
    source.next_item_type().unwrap();
    assert_eq!(source.read_run().unwrap().run, RunNumber(3));
    source.next_item_type().unwrap();
    let lumi = source.read_lumi().unwrap();
    assert_eq!((lumi.run, lumi.lumi), (RunNumber(3), LumiNumber(2)));
    source.next_item_type().unwrap();
    assert_eq!(source.read_event().unwrap().id, EventId::new(3, 2, 1));
    source.next_item_type().unwrap();
    assert_eq!(source.read_event().unwrap().id, EventId::new(3, 2, 2));
}

#[test]
fn event_numbers_continue_within_a_run_across_files() {
    let mut source = MockSource::parse("f r 1 l 1 e f r 1 l 1 e").unwrap();
    let mut ids = Vec::new();
    while source.next_item_type().unwrap() != ItemType::Stop {
        match source.current {
            Some(Item::Run(_)) => {
                source.read_run().unwrap();
            }
            Some(Item::Lumi(_)) => {
                source.read_lumi().unwrap();
            }
            Some(Item::Event) => ids.push(source.read_event().unwrap().id.event),
            _ => {}
        }
    }
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn reading_the_wrong_record_fails() {
    let mut source = MockSource::parse("f e").unwrap();
    source.next_item_type().unwrap();
    assert!(matches!(source.read_run(), Err(SourceError::NoRecord("run"))));
    source.next_item_type().unwrap();
    // No lumi has been read yet.
    assert!(matches!(source.read_event(), Err(SourceError::NoRecord("event"))));
}

#[test]
fn lumi_without_a_run_has_an_invalid_run() {
    let mut source = MockSource::parse("f l 4").unwrap();
    source.next_item_type().unwrap();
    assert_eq!(source.next_item_type().unwrap(), ItemType::Lumi);
    let lumi = source.read_lumi().unwrap();
    assert!(!lumi.run.is_valid());
    assert_eq!(lumi.lumi, LumiNumber(4));
}

#[test]
fn rewind_restarts_the_script() {
    let mut source = MockSource::parse("f r 1 l 1 e").unwrap();
    let first = drain(&mut source);
    source.rewind().unwrap();
    assert_eq!(drain(&mut source), first);
}

#[parameterized(
    unknown_item = { "f x", "unknown item 'x'" },
    run_without_number = { "f r", "'r' needs a positive number" },
    lumi_zero = { "f r 1 l 0", "'l' needs a positive number" },
    run_not_a_number = { "r one", "'r' needs a positive number" },
)]
fn invalid_scripts(script: &str, fragment: &str) {
    let err = MockSource::parse(script).unwrap_err();
    assert!(err.to_string().contains(fragment), "{err}");
}

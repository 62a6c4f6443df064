// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample() -> TriggerReport {
    TriggerReport {
        event_summary: EventSummary {
            total_events: 3,
            total_passed: 2,
            total_failed: 1,
        },
        trigger_paths: vec![PathSummary {
            name: "p1".into(),
            bit_position: 0,
            times_run: 3,
            times_passed: 2,
            times_failed: 1,
            times_except: 0,
            modules: vec![ModuleInPathSummary {
                label: "f".into(),
                action: FilterAction::Veto,
                times_visited: 3,
                times_passed: 2,
                times_failed: 1,
                times_except: 0,
            }],
        }],
        end_paths: vec![],
        workers: vec![WorkerSummary {
            label: "f".into(),
            type_name: "TestFilterModule".into(),
            times_visited: 3,
            times_run: 3,
            times_passed: 1,
            times_failed: 2,
            times_except: 0,
            cpu_time: 0.0,
            real_time: 0.0,
        }],
    }
}

#[test]
fn text_report_has_classic_sections() {
    let text = sample().to_string();
    assert!(text.contains("TrigReport Events total = 3 passed = 2 failed = 1"));
    assert!(text.contains("TrigReport ---------- Path   Summary ------------"));
    assert!(text.contains("TrigReport ---------- Modules in Path: p1 ------------"));
    assert!(text.contains("TimeReport ---------- Module Summary ---[sec]----"));
}

#[test]
fn module_lines_show_the_filter_action() {
    let text = sample().to_string();
    let line = text
        .lines()
        .find(|l| l.ends_with("!f"))
        .expect("veto line");
    assert!(line.starts_with("TrigReport"));
}

#[test]
fn json_uses_snake_case_fields() {
    let json = serde_json::to_value(sample()).unwrap();
    assert_eq!(json["event_summary"]["total_passed"], 2);
    assert_eq!(json["trigger_paths"][0]["modules"][0]["action"], "veto");
    assert_eq!(json["workers"][0]["type_name"], "TestFilterModule");
}

#[test]
fn lookups_by_name() {
    let report = sample();
    assert_eq!(report.path("p1").map(|p| p.times_run), Some(3));
    assert!(report.path("e1").is_none());
    assert_eq!(report.worker("f").map(|w| w.times_failed), Some(2));
}

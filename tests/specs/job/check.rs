//! `evs check` specs

use crate::prelude::*;

#[test]
fn check_summarizes_the_schedule() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    project
        .evs()
        .args(&["check", "job.toml"])
        .passes()
        .stdout_has("process SPEC: 8 module(s), 2 path(s), 1 end path(s)")
        .stdout_has("TriggerResultInserter");
}

#[test]
fn check_as_json() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    let run = project
        .evs()
        .args(&["check", "job.toml", "-o", "json"])
        .passes();

    let json = run.json();
    assert_eq!(json["process"], "SPEC");
    assert_eq!(json["trigger_paths"], serde_json::json!(["p1", "p2"]));
    assert_eq!(json["end_paths"], serde_json::json!(["e1"]));
}

#[test]
fn check_reads_json_configurations() {
    let project = Project::empty();
    project.file(
        "job.json",
        r#"{"module": {"a": {"type": "IntProducer", "ivalue": 4}}, "path": {"p1": ["a"]}}"#,
    );
    project
        .evs()
        .args(&["check", "job.json"])
        .passes()
        .stdout_has("process PROCESS: 2 module(s), 1 path(s), 0 end path(s)");
}

#[test]
fn conflicting_output_limits_are_rejected() {
    let project = Project::empty();
    project.file(
        "job.toml",
        r#"
[max_events]
output = 3

[module.out]
type = "SewerModule"
should_pass = 0
max_events = 1

[end_path]
e1 = ["out"]
"#,
    );
    project
        .evs()
        .args(&["check", "job.toml"])
        .fails()
        .code(2)
        .stderr_has("out");
}

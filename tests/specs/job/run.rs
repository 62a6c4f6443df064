//! `evs run` specs

use crate::prelude::*;

const INPUT: &str = "f r 1 l 1 e e l 2 e e s";

#[test]
fn run_prints_the_trigger_report() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    project
        .evs()
        .args(&["run", "job.toml", "--input", INPUT])
        .passes()
        .stdout_has("TrigReport Events total = 4 passed = 4 failed = 0")
        .stdout_has("TrigReport ---------- Path   Summary ------------")
        .stdout_has("Modules in Path: p2")
        .stdout_has("Modules in End-Path: e1")
        .stdout_has("TimeReport ---------- Module Summary ---[sec]----");
}

#[test]
fn run_report_as_json() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    let run = project
        .evs()
        .args(&["run", "job.toml", "--input", INPUT, "-o", "json"])
        .passes();

    let json = run.json();
    assert_eq!(json["event_summary"]["total_events"], 4);
    let p2 = &json["trigger_paths"][1];
    assert_eq!(p2["name"], "p2");
    assert_eq!(p2["times_passed"], 2);
    assert_eq!(p2["times_failed"], 2);
    let out = json["workers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["label"] == "out")
        .unwrap();
    assert_eq!(out["times_run"], 2);
}

#[test]
fn veto_inverts_a_filter_on_the_command_line_config() {
    let project = Project::empty();
    project.file(
        "job.toml",
        r#"
[module.half]
type = "TestFilterModule"
accept_value = 2
only_one = true

[path]
p1 = ["!half"]
"#,
    );
    let run = project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 l 1 e e e", "-o", "json"])
        .passes();

    let json = run.json();
    assert_eq!(json["event_summary"]["total_passed"], 2);
    assert_eq!(json["trigger_paths"][0]["modules"][0]["action"], "veto");
}

#[test]
fn module_failure_stops_the_job_and_names_the_module() {
    let project = Project::empty();
    project.file(
        "job.toml",
        r#"
[module.a]
type = "IntProducer"
ivalue = 1

[module.bad]
type = "FailingProducer"

[path]
p1 = ["a"]
p2 = ["bad"]
"#,
    );
    project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 l 1 e e e"])
        .fails()
        .code(1)
        .stderr_has("module 'bad' (FailingProducer) failed during event")
        .stderr_has("path 'p2'")
        .stdout_has("TrigReport Events total = 1 passed = 0 failed = 1");
}

#[test]
fn unexpected_item_is_a_protocol_error() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 e"])
        .fails()
        .code(1)
        .stderr_has("Event is not accepted in state");
}

#[test]
fn sewer_count_mismatch_fails_end_job() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 l 1 e"])
        .fails()
        .code(1)
        .stderr_has("end job failed")
        .stderr_has("SewerCount");
}

#[test]
fn no_end_paths_skips_output() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    let run = project
        .evs()
        .args(&[
            "run",
            "job.toml",
            "-i",
            "f r 1 l 1 e",
            "--no-end-paths",
            "-o",
            "json",
        ])
        .fails();

    let json = run.json();
    let out = json["workers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["label"] == "out")
        .unwrap();
    assert_eq!(out["times_run"], 0);
}

#[test]
fn debug_logging_goes_to_stderr() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    project
        .evs()
        .args(&["run", "job.toml", "-i", INPUT])
        .env("EVS_LOG", "evs::modules=info")
        .passes()
        .stdout_lacks("sewer drained")
        .stderr_has("sewer drained");
}

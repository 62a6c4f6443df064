//! Event limit and looping specs

use crate::prelude::*;

const COUNTING_JOB: &str = r#"
[module.a]
type = "IntProducer"
ivalue = 7

[path]
p1 = ["a"]
"#;

#[test]
fn max_events_flag_stops_reading_input() {
    let project = Project::empty();
    project.file("job.toml", COUNTING_JOB);
    project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 l 1 e e e e", "-n", "2"])
        .passes()
        .stdout_has("TrigReport Events total = 2 passed = 2 failed = 0");
}

#[test]
fn configured_input_limit() {
    let project = Project::empty();
    let job = format!("[max_events]\ninput = 3\n{}", COUNTING_JOB);
    project.file("job.toml", &job);
    project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 l 1 e e e e e"])
        .passes()
        .stdout_has("TrigReport Events total = 3 passed = 3 failed = 0");
}

#[test]
fn output_limit_ends_the_job() {
    let project = Project::empty();
    project.file(
        "job.toml",
        r#"
[max_events]
output = 1

[module.a]
type = "IntProducer"
ivalue = 7

[module.out]
type = "SewerModule"
should_pass = 1

[path]
p1 = ["a"]

[end_path]
e1 = ["out"]
"#,
    );
    project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 l 1 e e e e"])
        .passes()
        .stdout_has("TrigReport Events total = 1 passed = 1 failed = 0");
}

#[test]
fn loops_run_the_input_again() {
    let project = Project::empty();
    project.file("job.toml", COUNTING_JOB);
    project
        .evs()
        .args(&["run", "job.toml", "-i", "f r 1 l 1 e e e", "--loops", "3"])
        .passes()
        .stdout_has("TrigReport Events total = 9 passed = 9 failed = 0");
}

#[test]
fn empty_input_runs_no_events() {
    let project = Project::empty();
    project.file("job.toml", COUNTING_JOB);
    project
        .evs()
        .args(&["run", "job.toml"])
        .passes()
        .stdout_has("TrigReport Events total = 0 passed = 0 failed = 0");
}

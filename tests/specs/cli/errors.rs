//! CLI error handling specs
//!
//! Configuration problems exit with code 2, failed jobs with code 1.

use crate::prelude::*;

#[test]
fn missing_config_file_is_reported() {
    let project = Project::empty();
    project
        .evs()
        .args(&["run", "missing.toml"])
        .fails()
        .code(2)
        .stderr_has("Error: failed to read missing.toml");
}

#[test]
fn malformed_toml_is_reported() {
    let project = Project::empty();
    project.file("job.toml", "[module.a\n");
    project
        .evs()
        .args(&["check", "job.toml"])
        .fails()
        .code(2)
        .stderr_has("TOML parse error");
}

#[test]
fn unknown_label_on_a_path_is_a_config_error() {
    let project = Project::empty();
    project.file("job.toml", "[path]\np1 = [\"ghost\"]\n");
    project
        .evs()
        .args(&["check", "job.toml"])
        .fails()
        .code(2)
        .stderr_has("ghost");
}

#[test]
fn unknown_module_type_lists_known_types() {
    let project = Project::empty();
    let job = "[module.a]\ntype = \"Nope\"\n\n[path]\np1 = [\"a\"]\n";
    project.file("job.toml", job);
    project
        .evs()
        .args(&["run", "job.toml"])
        .fails()
        .code(2)
        .stderr_has("unknown module type 'Nope'")
        .stderr_has("IntProducer");
}

#[test]
fn bad_input_script_is_rejected() {
    let project = Project::empty();
    project.file("job.toml", FILTERED_JOB);
    project
        .evs()
        .args(&["run", "job.toml", "--input", "f r zero"])
        .fails()
        .code(2)
        .stderr_has("invalid input script");
}

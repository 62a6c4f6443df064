//! CLI help specs

use crate::prelude::*;

#[test]
fn no_arguments_prints_help() {
    cli()
        .passes()
        .stdout_has("Usage: evs")
        .stdout_has("run")
        .stdout_has("check");
}

#[test]
fn run_help_describes_the_input_script() {
    cli()
        .args(&["run", "--help"])
        .passes()
        .stdout_has("--input")
        .stdout_has("--max-events")
        .stdout_has("--loops");
}

#[test]
fn version_is_printed() {
    cli().args(&["--version"]).passes().stdout_has("evs ");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parse error tests.

use evs_config::{parse_config, ParseError};

#[yare::parameterized(
    missing_type = { "[module.a]\nivalue = 1", &["type"] },
    empty_type = { "[module.a]\ntype = \"\"", &["module.a.type", "empty"] },
    bad_kind = { "[module.a]\ntype = \"X\"\nkind = \"sink\"", &["sink"] },
    bad_file_mode = { "[options]\nfile_mode = \"sparse\"", &["sparse"] },
    bad_path_value = { "[path]\np = \"a\"", &["sequence"] },
    empty_entry = { "[path]\np = [\"a\", \"!\"]", &["path.p[1]", "no module label"] },
    negative_limit = { "[max_events]\ninput = -1", &["input"] },
)]
fn toml_errors(input: &str, fragments: &[&str]) {
    crate::assert_toml_err(input, fragments);
}

#[test]
fn duplicate_path_name_across_groups() {
    let err = parse_config(
        r#"
[path]
p = ["a"]

[end_path]
p = ["b"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidFormat { .. }));
    super::assert_err_contains(&err, &["end_path.p", "more than once"]);
}

#[test]
fn select_events_must_name_trigger_paths() {
    let err = parse_config(
        r#"
[module.out]
type = "SewerModule"
select_events = ["nope"]

[path]
p1 = ["a"]
p2 = ["b"]
"#,
    )
    .unwrap_err();
    super::assert_err_contains(
        &err,
        &[
            "module.out.select_events",
            "unknown trigger path 'nope'",
            "p1, p2",
        ],
    );
}

#[test]
fn syntax_error_is_a_toml_error() {
    let err = parse_config("[module.a\ntype = 1").unwrap_err();
    assert!(matches!(err, ParseError::Toml(_)));
}

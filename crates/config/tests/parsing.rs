// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for process configuration parsing.

#![allow(clippy::unwrap_used, clippy::panic)]

use evs_config::{parse_config, ParseError};

#[path = "parsing/errors.rs"]
mod errors;
#[path = "parsing/files.rs"]
mod files;

// ---------------------------------------------------------------------------
// Shared test helpers
// ---------------------------------------------------------------------------

fn assert_err_contains(err: &ParseError, fragments: &[&str]) {
    let msg = err.to_string();
    for frag in fragments {
        assert!(msg.contains(frag), "error should contain '{frag}': {msg}");
    }
}

fn assert_toml_err(input: &str, fragments: &[&str]) {
    assert_err_contains(&parse_config(input).unwrap_err(), fragments);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading configuration files from disk.

use evs_config::{load_config, ParseError};
use std::io::Write;

#[test]
fn loads_toml_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "process = \"DISK\"\n[module.a]\ntype = \"IntProducer\"").unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.process, "DISK");
    assert_eq!(config.modules["a"].label, "a");
}

#[test]
fn loads_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"process": "JSON", "paths": {{"p": ["a"]}}}}"#).unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.process, "JSON");
    assert_eq!(config.paths["p"], vec!["a"]);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ParseError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

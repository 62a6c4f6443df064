// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process configuration: modules, paths, options and event limits

mod module;
mod options;
mod parser;
mod path;
mod validate;

pub use module::ModuleDef;
pub use options::{MaxEvents, Options, OutputLimit};
pub use parser::{
    load_config, parse_config, parse_config_with_format, Format, ParseError, ProcessConfig,
};
pub use path::{FilterAction, PathEntry};

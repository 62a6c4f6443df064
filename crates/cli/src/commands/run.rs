// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `evs run <config> --input <script>` - run a job and print its trigger report

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use evs_engine::{CountingLooper, EventProcessor, MockSource, TracingObserver};

use crate::commands::check::{config_error, load};
use crate::exit_error::{self, ExitError};
use crate::modules;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Process configuration file (.toml or .json)
    pub config: PathBuf,

    /// Input item script, e.g. "f r 1 l 1 e e l 2 e s"
    #[arg(short = 'i', long = "input", default_value = "")]
    pub input: String,

    /// Stop after this many input events, overriding the configuration
    #[arg(short = 'n', long = "max-events")]
    pub max_events: Option<u64>,

    /// Number of passes over the input
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub loops: u32,

    /// Do not run the end paths
    #[arg(long = "no-end-paths")]
    pub no_end_paths: bool,
}

pub fn handle(args: RunArgs, format: OutputFormat) -> Result<()> {
    let config = load(&args.config)?;
    let source = MockSource::parse(&args.input).map_err(config_error)?;

    let mut processor = EventProcessor::from_config(
        &config,
        &modules::registry(),
        Box::new(source),
        vec![Arc::new(TracingObserver)],
    )
    .map_err(config_error)?;
    if args.max_events.is_some() {
        processor = processor.with_max_events(args.max_events);
    }
    if args.loops > 1 {
        processor = processor.with_looper(Box::new(CountingLooper::new(args.loops)));
    }
    processor
        .schedule_mut()
        .enable_end_paths(!args.no_end_paths);

    let outcome = processor.run_to_completion();
    let ended = processor.end_job();
    output::print(&processor.schedule().report(), format)?;

    outcome.map_err(job_error)?;
    ended.map_err(job_error)?;
    Ok(())
}

fn job_error(err: evs_engine::ProcessError) -> ExitError {
    ExitError::new(exit_error::JOB, err.to_string())
}

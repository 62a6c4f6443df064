// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopers run the whole input more than once

use evs_core::{EventPrincipal, ModuleError};

/// Decides whether to make another pass over the input.
#[allow(unused_variables)]
pub trait Looper {
    /// A pass begins. Iterations count from 1.
    fn starting_new_loop(&mut self, iteration: u32) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Called after each event; returning `true` ends the pass early.
    fn during_loop(&mut self, event: &EventPrincipal) -> Result<bool, ModuleError> {
        Ok(false)
    }

    /// The pass is over. Returning `true` stops the job.
    fn end_of_loop(&mut self, iteration: u32) -> Result<bool, ModuleError>;

    fn prepare_for_next_loop(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn end_of_job(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Runs a fixed number of passes.
#[derive(Debug, Clone)]
pub struct CountingLooper {
    passes: u32,
}

impl CountingLooper {
    pub fn new(passes: u32) -> Self {
        Self { passes }
    }
}

impl Looper for CountingLooper {
    fn end_of_loop(&mut self, iteration: u32) -> Result<bool, ModuleError> {
        Ok(iteration >= self.passes)
    }
}

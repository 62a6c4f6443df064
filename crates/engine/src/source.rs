// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input sources
//!
//! A source is asked for the type of its next item, then for the record
//! itself. [`MockSource`] replays a compact item script.

use crate::error::SourceError;
use evs_core::{
    EventId, EventPrincipal, FileBlock, LumiNumber, LumiPrincipal, RunNumber, RunPrincipal,
};
use std::collections::HashMap;

/// Kind of the next item in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    File,
    Run,
    Lumi,
    Event,
    Stop,
}

/// Where events come from.
pub trait InputSource {
    /// Advance to the next item and report its type.
    fn next_item_type(&mut self) -> Result<ItemType, SourceError>;

    fn read_file(&mut self) -> Result<FileBlock, SourceError>;

    fn read_run(&mut self) -> Result<RunPrincipal, SourceError>;

    fn read_lumi(&mut self) -> Result<LumiPrincipal, SourceError>;

    fn read_event(&mut self) -> Result<EventPrincipal, SourceError>;

    fn close_file(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Go back to the first item, for another loop over the input.
    fn rewind(&mut self) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    File,
    Run(RunNumber),
    Lumi(LumiNumber),
    Event,
    Stop,
}

/// Source driven by an item script such as `f r 1 l 1 e e l 2 e s`.
///
/// `f` opens a file, `r N` and `l N` start run and lumi N, `e` is one event
/// and `s` stops. The input also stops when the script runs out. Event
/// numbers count up per run, continuing across files.
#[derive(Debug, Clone)]
pub struct MockSource {
    items: Vec<Item>,
    position: usize,
    current: Option<Item>,
    files: u32,
    run: RunNumber,
    lumi: LumiNumber,
    last_event: HashMap<RunNumber, u64>,
}

impl MockSource {
    pub fn parse(script: &str) -> Result<Self, SourceError> {
        let mut items = Vec::new();
        let mut tokens = script.split_whitespace().enumerate();
        while let Some((position, token)) = tokens.next() {
            let item = match token {
                "f" => Item::File,
                "e" => Item::Event,
                "s" => Item::Stop,
                "r" | "l" => {
                    let number = tokens
                        .next()
                        .and_then(|(_, n)| n.parse::<u32>().ok())
                        .filter(|&n| n > 0)
                        .ok_or_else(|| SourceError::Script {
                            position,
                            message: format!("'{}' needs a positive number", token),
                        })?;
                    if token == "r" {
                        Item::Run(RunNumber(number))
                    } else {
                        Item::Lumi(LumiNumber(number))
                    }
                }
                other => {
                    return Err(SourceError::Script {
                        position,
                        message: format!("unknown item '{}'", other),
                    })
                }
            };
            items.push(item);
        }
        Ok(Self {
            items,
            position: 0,
            current: None,
            files: 0,
            run: RunNumber::INVALID,
            lumi: LumiNumber::INVALID,
            last_event: HashMap::new(),
        })
    }

    /// Number of items in the script.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl InputSource for MockSource {
    fn next_item_type(&mut self) -> Result<ItemType, SourceError> {
        let item = self.items.get(self.position).copied().unwrap_or(Item::Stop);
        if item != Item::Stop {
            self.position += 1;
        }
        self.current = Some(item);
        Ok(match item {
            Item::File => ItemType::File,
            Item::Run(_) => ItemType::Run,
            Item::Lumi(_) => ItemType::Lumi,
            Item::Event => ItemType::Event,
            Item::Stop => ItemType::Stop,
        })
    }

    fn read_file(&mut self) -> Result<FileBlock, SourceError> {
        match self.current {
            Some(Item::File) => {
                self.files += 1;
                Ok(FileBlock::new(format!("mock:{}", self.files)))
            }
            _ => Err(SourceError::NoRecord("file")),
        }
    }

    fn read_run(&mut self) -> Result<RunPrincipal, SourceError> {
        match self.current {
            Some(Item::Run(run)) => {
                self.run = run;
                self.lumi = LumiNumber::INVALID;
                Ok(RunPrincipal::new(run))
            }
            _ => Err(SourceError::NoRecord("run")),
        }
    }

    fn read_lumi(&mut self) -> Result<LumiPrincipal, SourceError> {
        match self.current {
            // Without an open run the record carries an invalid run number;
            // the job machine rejects the item.
            Some(Item::Lumi(lumi)) => {
                self.lumi = lumi;
                Ok(LumiPrincipal::new(self.run, lumi))
            }
            _ => Err(SourceError::NoRecord("lumi")),
        }
    }

    fn read_event(&mut self) -> Result<EventPrincipal, SourceError> {
        match self.current {
            Some(Item::Event) if self.lumi.is_valid() => {
                let counter = self.last_event.entry(self.run).or_insert(0);
                *counter += 1;
                Ok(EventPrincipal::new(EventId::new(self.run, self.lumi, *counter)))
            }
            _ => Err(SourceError::NoRecord("event")),
        }
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.position = 0;
        self.current = None;
        self.files = 0;
        self.run = RunNumber::INVALID;
        self.lumi = LumiNumber::INVALID;
        self.last_event.clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;

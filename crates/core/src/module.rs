// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The module interface
//!
//! A module is user code run by a worker. There are four kinds, each a trait
//! over the shared [`Lifecycle`] callbacks, wrapped by the [`Module`] enum.

use crate::id::{EventId, ModuleLabel};
use crate::principal::{
    Conditions, EventPrincipal, FileBlock, LumiPrincipal, Product, ProductKey, RunPrincipal,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Kind of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Producer,
    Filter,
    Analyzer,
    Output,
}

impl ModuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Producer => "producer",
            ModuleKind::Filter => "filter",
            ModuleKind::Analyzer => "analyzer",
            ModuleKind::Output => "output",
        }
    }

    /// Producers and filters may be run on demand.
    pub fn can_run_on_demand(self) -> bool {
        matches!(self, ModuleKind::Producer | ModuleKind::Filter)
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a configured module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescription {
    pub label: ModuleLabel,
    pub type_name: String,
    pub kind: ModuleKind,
    pub process_name: String,
    /// Stable hash of the module's configuration.
    pub config_id: String,
}

impl ModuleDescription {
    pub fn new(
        label: impl Into<ModuleLabel>,
        type_name: impl Into<String>,
        kind: ModuleKind,
    ) -> Self {
        Self {
            label: label.into(),
            type_name: type_name.into(),
            kind,
            process_name: String::new(),
            config_id: String::new(),
        }
    }

    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }

    pub fn with_config_id(mut self, id: impl Into<String>) -> Self {
        self.config_id = id.into();
        self
    }
}

/// An error raised by module code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{category}] {message}")]
pub struct ModuleError {
    pub category: String,
    pub message: String,
}

impl ModuleError {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
        }
    }

    pub fn product_already_put(key: &ProductKey) -> Self {
        Self::new(
            "ProductAlreadyPut",
            format!("'{}' already put instance '{}'", key.label, key.instance),
        )
    }

    pub fn product_not_found(key: &ProductKey) -> Self {
        let ProductKey { label, instance } = key;
        Self::new(
            "ProductNotFound",
            format!("no product from '{label}' instance '{instance}'"),
        )
    }
}

/// Resolves a missing event product by running its producer on demand.
pub trait ProductResolver {
    /// Run the on-demand module with this label for the event.
    ///
    /// Returns `Ok(false)` when no on-demand module has the label.
    fn resolve(
        &self,
        label: &str,
        event: &EventPrincipal,
        conditions: &Conditions,
    ) -> Result<bool, ModuleError>;
}

/// A module's view of the event it is processing.
pub struct Event<'a> {
    principal: &'a EventPrincipal,
    label: &'a ModuleLabel,
    conditions: &'a Conditions,
    resolver: Option<&'a dyn ProductResolver>,
}

impl<'a> Event<'a> {
    pub fn new(
        principal: &'a EventPrincipal,
        label: &'a ModuleLabel,
        conditions: &'a Conditions,
        resolver: Option<&'a dyn ProductResolver>,
    ) -> Self {
        Self {
            principal,
            label,
            conditions,
            resolver,
        }
    }

    pub fn id(&self) -> EventId {
        self.principal.id
    }

    pub fn conditions(&self) -> &Conditions {
        self.conditions
    }

    /// Put a product under this module's label. Each instance name can be
    /// put once per event.
    pub fn put<T: Any + Send + Sync>(&mut self, value: T) -> Result<(), ModuleError> {
        self.put_instance("", value)
    }

    pub fn put_instance<T: Any + Send + Sync>(
        &mut self,
        instance: &str,
        value: T,
    ) -> Result<(), ModuleError> {
        let key = ProductKey::new(self.label.clone(), instance);
        let product: Product = Arc::new(value);
        if self.principal.put(key.clone(), product) {
            Ok(())
        } else {
            Err(ModuleError::product_already_put(&key))
        }
    }

    /// Get a product by producer label, running an on-demand producer if needed.
    pub fn get<T: Any + Send + Sync>(&self, label: &str) -> Result<Arc<T>, ModuleError> {
        self.get_instance(label, "")
    }

    pub fn get_instance<T: Any + Send + Sync>(
        &self,
        label: &str,
        instance: &str,
    ) -> Result<Arc<T>, ModuleError> {
        let key = ProductKey::new(label, instance);
        let product = match self.principal.get(&key) {
            Some(product) => product,
            None => {
                let resolved = match self.resolver {
                    Some(resolver) => resolver.resolve(label, self.principal, self.conditions)?,
                    None => false,
                };
                if !resolved {
                    return Err(ModuleError::product_not_found(&key));
                }
                self.principal
                    .get(&key)
                    .ok_or_else(|| ModuleError::product_not_found(&key))?
            }
        };
        product.downcast::<T>().map_err(|_| {
            ModuleError::new(
                "ProductTypeMismatch",
                format!(
                    "product from '{}' instance '{}' is not a {}",
                    key.label,
                    key.instance,
                    std::any::type_name::<T>()
                ),
            )
        })
    }
}

/// Callbacks shared by every module kind. All default to no-ops.
#[allow(unused_variables)]
pub trait Lifecycle: Send {
    fn begin_job(&mut self, conditions: &Conditions) -> Result<(), ModuleError> {
        Ok(())
    }

    fn end_job(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn begin_run(
        &mut self,
        run: &RunPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    fn end_run(&mut self, run: &RunPrincipal, conditions: &Conditions) -> Result<(), ModuleError> {
        Ok(())
    }

    fn begin_lumi(
        &mut self,
        lumi: &LumiPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    fn end_lumi(
        &mut self,
        lumi: &LumiPrincipal,
        conditions: &Conditions,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    fn respond_to_open_input_file(&mut self, file: &FileBlock) -> Result<(), ModuleError> {
        Ok(())
    }

    fn respond_to_close_input_file(&mut self, file: &FileBlock) -> Result<(), ModuleError> {
        Ok(())
    }

    fn respond_to_open_output_files(&mut self, file: &FileBlock) -> Result<(), ModuleError> {
        Ok(())
    }

    fn respond_to_close_output_files(&mut self, file: &FileBlock) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Adds products to events.
pub trait Producer: Lifecycle {
    fn produce(&mut self, event: &mut Event<'_>) -> Result<(), ModuleError>;
}

/// Decides whether a path continues.
pub trait Filter: Lifecycle {
    fn filter(&mut self, event: &mut Event<'_>) -> Result<bool, ModuleError>;
}

/// Reads events without changing them.
pub trait Analyzer: Lifecycle {
    fn analyze(&mut self, event: &Event<'_>) -> Result<(), ModuleError>;
}

/// Persists events and run/lumi records.
#[allow(unused_variables)]
pub trait OutputModule: Lifecycle {
    fn write(&mut self, event: &Event<'_>) -> Result<(), ModuleError>;

    fn write_run(&mut self, run: &RunPrincipal) -> Result<(), ModuleError> {
        Ok(())
    }

    fn write_lumi(&mut self, lumi: &LumiPrincipal) -> Result<(), ModuleError> {
        Ok(())
    }

    fn open_file(&mut self, file: &FileBlock) -> Result<(), ModuleError> {
        Ok(())
    }

    fn close_file(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// File boundary notifications forwarded to every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTransition {
    OpenInput,
    CloseInput,
    OpenOutput,
    CloseOutput,
}

macro_rules! dispatch {
    ($module:expr, $m:ident => $call:expr) => {
        match $module {
            Module::Producer($m) => $call,
            Module::Filter($m) => $call,
            Module::Analyzer($m) => $call,
            Module::Output($m) => $call,
        }
    };
}

/// A module of any kind.
pub enum Module {
    Producer(Box<dyn Producer>),
    Filter(Box<dyn Filter>),
    Analyzer(Box<dyn Analyzer>),
    Output(Box<dyn OutputModule>),
}

impl Module {
    pub fn producer(m: impl Producer + 'static) -> Self {
        Module::Producer(Box::new(m))
    }

    pub fn filter(m: impl Filter + 'static) -> Self {
        Module::Filter(Box::new(m))
    }

    pub fn analyzer(m: impl Analyzer + 'static) -> Self {
        Module::Analyzer(Box::new(m))
    }

    pub fn output(m: impl OutputModule + 'static) -> Self {
        Module::Output(Box::new(m))
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            Module::Producer(_) => ModuleKind::Producer,
            Module::Filter(_) => ModuleKind::Filter,
            Module::Analyzer(_) => ModuleKind::Analyzer,
            Module::Output(_) => ModuleKind::Output,
        }
    }

    pub fn begin_job(&mut self, conditions: &Conditions) -> Result<(), ModuleError> {
        dispatch!(self, m => m.begin_job(conditions))
    }

    pub fn end_job(&mut self) -> Result<(), ModuleError> {
        dispatch!(self, m => m.end_job())
    }

    /// Run the callback for a non-event occurrence.
    pub fn process_transition(
        &mut self,
        occurrence: Occurrence<'_>,
        conditions: &Conditions,
    ) -> Result<(), ModuleError> {
        match occurrence {
            Occurrence::Event(_) => Ok(()),
            Occurrence::BeginRun(run) => dispatch!(self, m => m.begin_run(run, conditions)),
            Occurrence::EndRun(run) => dispatch!(self, m => m.end_run(run, conditions)),
            Occurrence::BeginLumi(lumi) => dispatch!(self, m => m.begin_lumi(lumi, conditions)),
            Occurrence::EndLumi(lumi) => dispatch!(self, m => m.end_lumi(lumi, conditions)),
        }
    }

    /// Forward a file boundary notification.
    pub fn respond_to_file(
        &mut self,
        transition: FileTransition,
        file: &FileBlock,
    ) -> Result<(), ModuleError> {
        match transition {
            FileTransition::OpenInput => dispatch!(self, m => m.respond_to_open_input_file(file)),
            FileTransition::CloseInput => dispatch!(self, m => m.respond_to_close_input_file(file)),
            FileTransition::OpenOutput => {
                dispatch!(self, m => m.respond_to_open_output_files(file))
            }
            FileTransition::CloseOutput => {
                dispatch!(self, m => m.respond_to_close_output_files(file))
            }
        }
    }

    /// Run the event callback and return the filter decision. Only filters
    /// can return false.
    pub fn process_event(&mut self, event: &mut Event<'_>) -> Result<bool, ModuleError> {
        match self {
            Module::Producer(m) => m.produce(event).map(|()| true),
            Module::Filter(m) => m.filter(event),
            Module::Analyzer(m) => m.analyze(event).map(|()| true),
            Module::Output(m) => m.write(event).map(|()| true),
        }
    }

    pub fn as_output(&mut self) -> Option<&mut dyn OutputModule> {
        match self {
            Module::Output(m) => Some(m.as_mut()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module::{}", self.kind())
    }
}

/// Which callback a worker is being run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Event,
    BeginRun,
    EndRun,
    BeginLumi,
    EndLumi,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Event => "event",
            Phase::BeginRun => "begin_run",
            Phase::EndRun => "end_run",
            Phase::BeginLumi => "begin_lumi",
            Phase::EndLumi => "end_lumi",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work together with the record it applies to.
#[derive(Debug, Clone, Copy)]
pub enum Occurrence<'a> {
    Event(&'a EventPrincipal),
    BeginRun(&'a RunPrincipal),
    EndRun(&'a RunPrincipal),
    BeginLumi(&'a LumiPrincipal),
    EndLumi(&'a LumiPrincipal),
}

impl Occurrence<'_> {
    pub fn phase(&self) -> Phase {
        match self {
            Occurrence::Event(_) => Phase::Event,
            Occurrence::BeginRun(_) => Phase::BeginRun,
            Occurrence::EndRun(_) => Phase::EndRun,
            Occurrence::BeginLumi(_) => Phase::BeginLumi,
            Occurrence::EndLumi(_) => Phase::EndLumi,
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Occurrence::Event(_))
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod tests;

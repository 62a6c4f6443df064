// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Toy modules compiled into the `evs` binary

use evs_config::ModuleDef;
use evs_core::{
    Analyzer, Event, Filter, Lifecycle, Module, ModuleError, OutputModule, Producer,
    TriggerResults,
};
use evs_engine::{ModuleRegistry, TRIGGER_RESULTS_LABEL};

/// Every module type the CLI knows about.
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register("IntProducer", |def| {
            Ok(Module::producer(IntProducer {
                value: required_int(def, "ivalue")?,
            }))
        })
        .register("AddIntsProducer", |def| {
            Ok(Module::producer(AddIntsProducer {
                labels: def.strings("labels"),
            }))
        })
        .register("FailingProducer", |_| Ok(Module::producer(FailingProducer)))
        .register("TestFilterModule", |def| {
            let accept_value = def.int("accept_value").unwrap_or(1);
            if accept_value <= 0 {
                return Err(param_error(def, "accept_value", "must be positive"));
            }
            Ok(Module::filter(TestFilterModule {
                count: 0,
                accept_value,
                only_one: def.bool("only_one").unwrap_or(false),
            }))
        })
        .register("TestResultAnalyzer", |def| {
            Ok(Module::analyzer(TestResultAnalyzer {
                name: def.str("name").unwrap_or("DEFAULT").to_string(),
                num_bits: def.int("numbits").and_then(|n| usize::try_from(n).ok()),
                passed: 0,
                failed: 0,
            }))
        })
        .register("IntTestAnalyzer", |def| {
            let label = def
                .str("module_label")
                .ok_or_else(|| param_error(def, "module_label", "is required"))?;
            Ok(Module::analyzer(IntTestAnalyzer {
                label: label.to_string(),
                expected: required_int(def, "value_must_match")?,
            }))
        })
        .register("SewerModule", |def| {
            Ok(Module::output(SewerModule {
                name: def.str("name").unwrap_or(&def.label).to_string(),
                should_pass: required_int(def, "should_pass")?,
                total: 0,
            }))
        });
    registry
}

fn required_int(def: &ModuleDef, key: &str) -> Result<i64, ModuleError> {
    def.int(key)
        .ok_or_else(|| param_error(def, key, "is required and must be an integer"))
}

fn param_error(def: &ModuleDef, key: &str, message: &str) -> ModuleError {
    ModuleError::new(
        "Configuration",
        format!("{} parameter '{}' {}", def.type_name, key, message),
    )
}

/// Puts a constant integer.
struct IntProducer {
    value: i64,
}

impl Lifecycle for IntProducer {}

impl Producer for IntProducer {
    fn produce(&mut self, event: &mut Event<'_>) -> Result<(), ModuleError> {
        event.put(self.value)
    }
}

/// Puts the sum of the integers made by `labels`.
struct AddIntsProducer {
    labels: Vec<String>,
}

impl Lifecycle for AddIntsProducer {}

impl Producer for AddIntsProducer {
    fn produce(&mut self, event: &mut Event<'_>) -> Result<(), ModuleError> {
        let mut sum = 0;
        for label in &self.labels {
            sum += *event.get::<i64>(label)?;
        }
        event.put(sum)
    }
}

struct FailingProducer;

impl Lifecycle for FailingProducer {}

impl Producer for FailingProducer {
    fn produce(&mut self, _: &mut Event<'_>) -> Result<(), ModuleError> {
        Err(ModuleError::new("Intentional", "failing producer always fails"))
    }
}

/// Accepts `accept_value` events in every hundred, or with `only_one` every
/// `accept_value`-th event.
struct TestFilterModule {
    count: i64,
    accept_value: i64,
    only_one: bool,
}

impl Lifecycle for TestFilterModule {}

impl Filter for TestFilterModule {
    fn filter(&mut self, _: &mut Event<'_>) -> Result<bool, ModuleError> {
        self.count += 1;
        if self.only_one {
            Ok(self.count % self.accept_value == 0)
        } else {
            Ok(self.count % 100 <= self.accept_value)
        }
    }
}

/// Counts accepted events from the stored trigger results.
struct TestResultAnalyzer {
    name: String,
    num_bits: Option<usize>,
    passed: u64,
    failed: u64,
}

impl Lifecycle for TestResultAnalyzer {
    fn end_job(&mut self) -> Result<(), ModuleError> {
        tracing::info!(
            target: "evs::modules",
            name = %self.name,
            passed = self.passed,
            failed = self.failed,
            "trigger results seen"
        );
        Ok(())
    }
}

impl Analyzer for TestResultAnalyzer {
    fn analyze(&mut self, event: &Event<'_>) -> Result<(), ModuleError> {
        let Ok(results) = event.get::<TriggerResults>(TRIGGER_RESULTS_LABEL) else {
            return Ok(());
        };
        if results.accept() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        match self.num_bits {
            Some(expected) if expected != results.bits.len() => Err(ModuleError::new(
                "TriggerResults",
                format!(
                    "{} expected {} bits, got {}",
                    self.name,
                    expected,
                    results.bits.len()
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// Checks that a producer's integer has the expected value.
struct IntTestAnalyzer {
    label: String,
    expected: i64,
}

impl Lifecycle for IntTestAnalyzer {}

impl Analyzer for IntTestAnalyzer {
    fn analyze(&mut self, event: &Event<'_>) -> Result<(), ModuleError> {
        let value = *event.get::<i64>(&self.label)?;
        if value != self.expected {
            return Err(ModuleError::new(
                "ValueMismatch",
                format!(
                    "'{}' made {}, expected {}",
                    self.label, value, self.expected
                ),
            ));
        }
        Ok(())
    }
}

/// Discards events, checking at end of job how many it was given.
struct SewerModule {
    name: String,
    should_pass: i64,
    total: i64,
}

impl Lifecycle for SewerModule {
    fn end_job(&mut self) -> Result<(), ModuleError> {
        tracing::info!(
            target: "evs::modules",
            name = %self.name,
            total = self.total,
            "sewer drained"
        );
        if self.total != self.should_pass {
            return Err(ModuleError::new(
                "SewerCount",
                format!(
                    "{} expected {} events, got {}",
                    self.name, self.should_pass, self.total
                ),
            ));
        }
        Ok(())
    }
}

impl OutputModule for SewerModule {
    fn write(&mut self, _: &Event<'_>) -> Result<(), ModuleError> {
        self.total += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "modules_tests.rs"]
mod tests;

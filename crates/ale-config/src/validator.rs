//! Configuration validation.

use std::collections::HashSet;

use ale_cycle::{command_boundary, event_boundary, port_boundary, Boundary, CycleError};
use ale_sim::MANUAL_TRIGGER_PREFIX;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// What a cycle entry contributes to cross-checks.
struct CycleRefs {
    path: String,
    locked: Vec<String>,
    boundary: Option<Boundary>,
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_engine(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_readers(config, &mut result);
        Self::validate_triggers(config, &mut result);

        let refs = Self::validate_cycles(config, &mut result);
        Self::validate_references(config, &refs, &mut result);

        Ok(result)
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        let engine = &config.engine;
        if engine.join_timeout_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "engine.join_timeout_ms",
                "dispose will not wait for cycle workers to exit",
            ));
        }
        if engine.data_lock_timeout_ms < engine.data_lock_step_ms {
            result.add_warning(ValidationWarning::new(
                "engine.data_lock_timeout_ms",
                "shorter than data_lock_step_ms, contended sightings get a single attempt",
            ));
        }
        if engine.thread_name_prefix.trim().is_empty() {
            result.add_error(ValidationError::new(
                "engine.thread_name_prefix",
                "thread name prefix cannot be empty",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim();
        if !level.contains('=') && !LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!("Unknown log level '{}', valid values: {:?}", level, LEVELS),
            ));
        }
        if config.logging.directory.is_some() && config.logging.max_log_files == 0 {
            result.add_error(ValidationError::new(
                "logging.max_log_files",
                "max_log_files must be greater than 0",
            ));
        }
    }

    fn validate_readers(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for (i, reader) in config.readers.iter().enumerate() {
            let path = format!("readers[{}]", i);
            if reader.name.trim().is_empty() {
                result.add_error(ValidationError::new(format!("{}.name", path), "Reader name cannot be empty"));
            } else if !seen.insert(reader.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate reader '{}'", reader.name),
                ));
            }
            if !reader.epcs.is_empty() && reader.period_ms == 0 {
                result.add_error(ValidationError::new(
                    format!("{}.period_ms", path),
                    "period_ms must be greater than 0",
                ));
            }
            for epc in &reader.epcs {
                if epc.is_empty() || !epc.chars().all(|c| c.is_ascii_hexdigit()) {
                    result.add_error(ValidationError::new(
                        format!("{}.epcs", path),
                        format!("EPC '{}' is not hexadecimal", epc),
                    ));
                }
            }
            match reader.gpio_period_ms {
                Some(0) => result.add_error(ValidationError::new(
                    format!("{}.gpio_period_ms", path),
                    "gpio_period_ms must be greater than 0",
                )),
                None if !reader.input_ports.is_empty() => result.add_warning(ValidationWarning::new(
                    format!("{}.input_ports", path),
                    "gpio_period_ms is not set, input ports never change",
                )),
                _ => {}
            }
        }
    }

    fn validate_triggers(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for (i, trigger) in config.triggers.iter().enumerate() {
            let path = format!("triggers[{}]", i);
            if trigger.name.trim().is_empty() {
                result.add_error(ValidationError::new(format!("{}.name", path), "Trigger name cannot be empty"));
            } else if !seen.insert(trigger.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate trigger '{}'", trigger.name),
                ));
            }
            match trigger.every_ms {
                Some(0) => result.add_error(ValidationError::new(
                    format!("{}.every_ms", path),
                    "every_ms must be greater than 0",
                )),
                None => result.add_warning(ValidationWarning::new(
                    format!("{}.every_ms", path),
                    "every_ms is not set, the trigger is never fired",
                )),
                _ => {}
            }
        }
    }

    fn boundary_error(result: &mut ValidationResult, path: &str, err: CycleError) {
        let path = match &err {
            CycleError::InvalidBoundary { field, .. } if field != "boundarySpec" => {
                format!("{}.spec.boundarySpec.{}", path, field)
            }
            _ => format!("{}.spec.boundarySpec", path),
        };
        result.add_error(ValidationError::new(path, err.to_string()));
    }

    fn validate_cycles(config: &Config, result: &mut ValidationResult) -> Vec<CycleRefs> {
        let mut refs = Vec::new();
        let mut names = HashSet::new();
        let mut check_name = |result: &mut ValidationResult, path: &str, name: &str| {
            if name.trim().is_empty() {
                result.add_error(ValidationError::new(format!("{}.name", path), "Cycle name cannot be empty"));
            } else if !names.insert(name.to_string()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate cycle '{}'", name),
                ));
            }
        };

        for (i, cycle) in config.event_cycles.iter().enumerate() {
            let path = format!("event_cycles[{}]", i);
            check_name(result, &path, &cycle.name);
            if cycle.spec.logical_readers.is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.spec.logicalReaders", path),
                    "An event cycle needs at least one logical reader",
                ));
            }
            let boundary = match event_boundary(&cycle.spec.boundary_spec) {
                Ok(b) => Some(b.base),
                Err(err) => {
                    Self::boundary_error(result, &path, err);
                    None
                }
            };
            refs.push(CycleRefs {
                path,
                locked: cycle.spec.logical_readers.clone(),
                boundary,
            });
        }

        for (i, cycle) in config.command_cycles.iter().enumerate() {
            let path = format!("command_cycles[{}]", i);
            check_name(result, &path, &cycle.name);
            if cycle.spec.logical_readers.is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.spec.logicalReaders", path),
                    "A command cycle needs at least one logical reader",
                ));
            }
            for (j, cmd) in cycle.spec.cmd_specs.iter().enumerate() {
                if cmd.name.trim().is_empty() {
                    result.add_error(ValidationError::new(
                        format!("{}.spec.cmdSpecs[{}].name", path, j),
                        "Command spec name cannot be empty",
                    ));
                }
            }
            let boundary = match command_boundary(&cycle.spec.boundary_spec) {
                Ok(b) => Some(b.base),
                Err(err) => {
                    Self::boundary_error(result, &path, err);
                    None
                }
            };
            refs.push(CycleRefs {
                path,
                locked: cycle.spec.logical_readers.clone(),
                boundary,
            });
        }

        for (i, cycle) in config.port_cycles.iter().enumerate() {
            let path = format!("port_cycles[{}]", i);
            check_name(result, &path, &cycle.name);
            let boundary = match port_boundary(&cycle.spec.boundary_spec) {
                Ok(b) => Some(b.base),
                Err(err) => {
                    Self::boundary_error(result, &path, err);
                    None
                }
            };
            if cycle.spec.logical_readers.is_empty()
                && boundary.as_ref().is_some_and(|b| b.start_triggers.is_empty())
            {
                result.add_error(ValidationError::new(
                    format!("{}.spec", path),
                    "A port cycle without logical readers needs a start trigger",
                ));
            }
            let mut locked = cycle.spec.logical_readers.clone();
            for report in &cycle.spec.report_specs {
                for op in &report.operations {
                    if !locked.contains(&op.reader) {
                        locked.push(op.reader.clone());
                    }
                }
            }
            refs.push(CycleRefs { path, locked, boundary });
        }

        refs
    }

    fn validate_references(config: &Config, refs: &[CycleRefs], result: &mut ValidationResult) {
        let declared: HashSet<&str> = config.triggers.iter().map(|t| t.name.as_str()).collect();

        for cycle in refs {
            for reader in &cycle.locked {
                if config.reader(reader).is_none() {
                    result.add_error(ValidationError::new(
                        format!("{}.spec.logicalReaders", cycle.path),
                        format!("Unknown reader '{}'", reader),
                    ));
                }
            }

            let Some(boundary) = &cycle.boundary else {
                continue;
            };
            for uri in boundary.start_triggers.iter().chain(&boundary.stop_triggers) {
                if let Some(name) = uri.strip_prefix(MANUAL_TRIGGER_PREFIX) {
                    if !declared.contains(name) {
                        result.add_warning(ValidationWarning::new(
                            format!("{}.spec.boundarySpec", cycle.path),
                            format!("Manual trigger '{}' is not declared and will never fire", name),
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

//! The `log` module configures the crate's logging facilities. Logging is for messages about the
//! progress and internal behavior of a run. This is not to be confused with _reporting_, which
//! records simulation output to CSV files.
//!
//! This module (re)exports the five logging macros: `error!`, `warn!`, `info!`, `debug!` and
//! `trace!` where `error!` represents the highest-priority log messages and `trace!` the lowest.
//!
//! ```rust
//! use epistate::info;
//!
//! pub fn do_a_thing() {
//!     info!("A thing is being done.");
//! }
//! ```
//!
//! Logging is _disabled_ by default. Logging messages can be enabled by passing the command line
//! option `--log-level <level>`, or from code using the functions:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!
//! Per-module filtering of messages can be configured using `set_module_filter()` /
//! `set_module_filters()` and `remove_module_filter()`:
//!
//! ```rust
//! use epistate::log::{set_module_filter, set_log_level, LevelFilter};
//!
//! pub fn setup_logging() -> Result<(), epistate::EpiError> {
//!     // Enable `info` log messages globally.
//!     set_log_level(LevelFilter::Info)?;
//!     // Trace every transition draw.
//!     set_module_filter("epistate::progression", LevelFilter::Trace)
//! }
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::error::EpiError;

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// Different log level filters can be applied to the log messages emitted from different modules
/// according to the module path (e.g. `"epistate::progression"`). These are stored in the global
/// `LogConfiguration`.
#[derive(Debug, Clone, PartialEq)]
struct ModuleLogConfiguration {
    /// The module path this configuration applies to
    module: String,
    /// The maximum log level for this module path
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Holds logging configuration. It's primary responsibility is to keep track of the filter levels
/// of modules and hold a handle to the global logger.
///
/// Because loggers are globally installed, only one instance of this struct should exist. The
/// public API are free functions which fetch the singleton and call the appropriate member
/// function.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// The "default" level filter for modules ("targets") without an explicitly set filter. A
    /// global filter level of `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    pub(in crate::log) module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(feature = "logging")]
    /// Handle to the `log4rs` logger.
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::new(),

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    /// Applies `apply` and installs the resulting logger configuration. If the logger rejects
    /// it, the previous filters are restored.
    fn update(&mut self, apply: impl FnOnce(&mut Self) -> bool) -> Result<(), EpiError> {
        let global_log_level = self.global_log_level;
        let module_configurations = self.module_configurations.clone();
        if !apply(self) {
            return Ok(());
        }
        let result = self.set_config();
        if result.is_err() {
            self.global_log_level = global_log_level;
            self.module_configurations = module_configurations;
        }
        result
    }

    pub(in crate::log) fn set_log_level(&mut self, level: LevelFilter) -> Result<(), EpiError> {
        self.update(|config| {
            config.global_log_level = level;
            true
        })
    }

    /// Returns true if the configuration was mutated, false otherwise.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                let module_config = entry.get_mut();
                if module_config.level == level {
                    return false;
                }
                module_config.level = level;
            }

            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    pub(in crate::log) fn set_module_filters(
        &mut self,
        module_filters: &[(&str, LevelFilter)],
    ) -> Result<(), EpiError> {
        for (module, _) in module_filters {
            validate_module_path(module)?;
        }
        self.update(|config| {
            let mut mutated: bool = false;
            for (module, level) in module_filters {
                mutated |= config.insert_module_filter(module, *level);
            }
            mutated
        })
    }

    pub(in crate::log) fn remove_module_filter(&mut self, module: &str) -> Result<(), EpiError> {
        self.update(|config| config.module_configurations.remove(module).is_some())
    }
}

// The public API

/// Enables the logger with no global level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
///
/// # Errors
/// Returns `EpiError::ConfigError` if the logger can't be installed.
pub fn enable_logging() -> Result<(), EpiError> {
    set_log_level(LevelFilter::Trace)
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
///
/// # Errors
/// Returns `EpiError::ConfigError` if the logger can't be installed.
pub fn disable_logging() -> Result<(), EpiError> {
    set_log_level(LevelFilter::Off)
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
///
/// # Errors
/// Returns `EpiError::ConfigError` if the logger can't be installed.
pub fn set_log_level(level: LevelFilter) -> Result<(), EpiError> {
    get_log_configuration().set_log_level(level)
}

/// Sets a level filter for the given module path.
///
/// # Errors
/// Returns `EpiError::ConfigError` if `module_path` isn't a valid module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) -> Result<(), EpiError> {
    get_log_configuration().set_module_filters(&[(module_path, level_filter)])
}

/// Removes a module-specific level filter for the given module path. The global level filter will
/// apply to the module.
///
/// # Errors
/// Returns `EpiError::ConfigError` if the logger can't be installed.
pub fn remove_module_filter(module_path: &str) -> Result<(), EpiError> {
    get_log_configuration().remove_module_filter(module_path)
}

/// Sets the level filters for a set of modules. Use this instead of `set_module_filter()` to set
/// filters in bulk.
///
/// # Errors
/// Returns `EpiError::ConfigError` if any module path is invalid. No filter is set in that case.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) -> Result<(), EpiError> {
    get_log_configuration().set_module_filters(module_filters)
}

/// Applies a log specification such as `"info"` or `"warn,epistate::progression=trace"`: a
/// comma-separated list of `module=level` filters and at most one bare global level.
///
/// # Errors
/// Returns `EpiError::ConfigError` if a level isn't recognized, a module path is malformed or
/// more than one global level is given. Nothing is applied in that case.
pub fn set_log_spec(spec: &str) -> Result<(), EpiError> {
    let (global, modules) = parse_log_spec(spec)?;
    get_log_configuration().update(|config| {
        let mut mutated = false;
        if let Some(level) = global {
            mutated |= config.global_log_level != level;
            config.global_log_level = level;
        }
        for (module, level) in &modules {
            mutated |= config.insert_module_filter(module, *level);
        }
        mutated
    })
}

type LogSpec = (Option<LevelFilter>, Vec<(String, LevelFilter)>);

fn parse_level(level: &str) -> Result<LevelFilter, EpiError> {
    LevelFilter::from_str(level.trim())
        .map_err(|_| EpiError::ConfigError(format!("unknown log level {level:?}")))
}

// A module path is one or more non-empty `::`-separated segments.
fn validate_module_path(module: &str) -> Result<(), EpiError> {
    if module.split("::").any(|segment| segment.trim().is_empty()) {
        return Err(EpiError::ConfigError(format!(
            "invalid module path {module:?} in log spec"
        )));
    }
    Ok(())
}

fn parse_log_spec(spec: &str) -> Result<LogSpec, EpiError> {
    let mut global = None;
    let mut modules = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        if let Some((module, level)) = part.split_once('=') {
            let module = module.trim();
            validate_module_path(module)?;
            modules.push((module.to_string(), parse_level(level)?));
        } else if global.replace(parse_level(part)?).is_some() {
            return Err(EpiError::ConfigError(format!(
                "log spec {spec:?} has more than one global level"
            )));
        }
    }
    Ok((global, modules))
}

/// Fetches a mutable reference to the global `LogConfiguration`.
fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

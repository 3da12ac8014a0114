//! Process-wide logging setup
//!
//! Logging is installed once at startup by [`init_logging`]. The returned
//! [`LogHandle`] lets the bootstrap change the level after the runtime
//! arguments are parsed.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt as fmt_layer, layer::SubscriberExt, reload};

use crate::http::trace;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log level: {0} (expected ERROR, WARN, INFO, DEBUG or TRACE)")]
    UnknownLevel(String),

    #[error("failed to install subscriber: {0}")]
    Init(String),

    #[error("failed to update log filter: {0}")]
    Reload(#[from] reload::Error),
}

/// Worker log levels accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::UnknownLevel(s.to_string())),
        }
    }
}

/// Handle to the installed filter
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

impl LogHandle {
    /// Replace the active filter with `level`. HTTP trace records stay enabled.
    pub fn set_level(&self, level: LogLevel) -> Result<(), LoggingError> {
        self.filter.reload(level_filter(level))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn detached(level: LogLevel) -> (reload::Layer<EnvFilter, Registry>, Self) {
        let (layer, filter) = reload::Layer::new(level_filter(level));
        (layer, Self { filter })
    }

    #[cfg(test)]
    pub(crate) fn current_filter(&self) -> String {
        self.filter
            .with_current(|filter| filter.to_string())
            .unwrap_or_default()
    }
}

/// Global `level`, with the HTTP trace target kept at `debug` or finer.
pub(crate) fn level_filter(level: LogLevel) -> EnvFilter {
    let http_level = match level {
        LogLevel::Trace => LogLevel::Trace,
        _ => LogLevel::Debug,
    };
    EnvFilter::new(format!("{},{}={}", level, trace::TARGET, http_level))
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `default_level`.
pub fn init_logging(default_level: LogLevel) -> Result<LogHandle, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level_filter(default_level));
    let (filter, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer::layer().with_target(true))
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LogHandle { filter: handle })
}

use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use super::args::RuntimeArgs;

/// Configuration handed to the realtime server or the work loop
///
/// Built by the caller, completed once by the bootstrap, then moved into
/// exactly one consumer.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Set when the bootstrap starts.
    pub reference_counter_start: Instant,
    pub rp_args: RuntimeArgs,
    /// argv with the worker's own tokens removed, program name first.
    pub residual_args: Vec<String>,
    /// User settings passed through untouched.
    pub extra: Map<String, Value>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self {
            reference_counter_start: Instant::now(),
            rp_args: RuntimeArgs::default(),
            residual_args: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn uptime(&self) -> Duration {
        self.reference_counter_start.elapsed()
    }

    /// `--test_input` payload, if the worker was started for a local test run.
    pub fn test_input(&self) -> Option<&Value> {
        self.rp_args.test_input.as_ref()
    }

    pub fn debugger_enabled(&self) -> bool {
        self.rp_args.rp_debugger.unwrap_or(false)
    }
}

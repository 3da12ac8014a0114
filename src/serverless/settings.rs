//! Environment-derived worker settings
//!
//! - `RUNPOD_REALTIME_PORT` - port for the realtime API server, `0` disables it
//! - `RUNPOD_REALTIME_CONCURRENCY` - concurrent requests the server accepts

use std::collections::HashMap;

use config::{ConfigError, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "RUNPOD";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub realtime_port: u16,
    #[serde(default = "default_realtime_concurrency")]
    pub realtime_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            realtime_port: 0,
            realtime_concurrency: default_realtime_concurrency(),
        }
    }
}

fn default_realtime_concurrency() -> usize {
    1
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::with_prefix(ENV_PREFIX))
    }

    /// Read settings from an explicit variable map instead of the process environment.
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_source(
            Environment::with_prefix(ENV_PREFIX).source(Some(vars.into_iter().collect())),
        )
    }

    fn from_source(environment: Environment) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_map(HashMap::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.realtime_port, 0);
        assert_eq!(settings.realtime_concurrency, 1);
    }

    #[test]
    fn test_reads_port_and_concurrency() {
        let settings = Settings::from_map(vars(&[
            ("RUNPOD_REALTIME_PORT", "8000"),
            ("RUNPOD_REALTIME_CONCURRENCY", "4"),
        ]))
        .unwrap();

        assert_eq!(settings.realtime_port, 8000);
        assert_eq!(settings.realtime_concurrency, 4);
    }

    #[test]
    fn test_unrelated_variables_ignored() {
        let settings = Settings::from_map(vars(&[
            ("RUNPOD_AI_API_KEY", "secret"),
            ("RUNPOD_POD_ID", "abc123"),
            ("OTHER_REALTIME_PORT", "9"),
        ]))
        .unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_non_numeric_port_rejected() {
        let result = Settings::from_map(vars(&[("RUNPOD_REALTIME_PORT", "eighty")]));
        assert!(result.is_err());
    }
}

//! Credential file backend
//!
//! Profiles live in `~/.runpod/config.toml`:
//!
//! ```toml
//! [default]
//! api_key = "..."
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::http::{CredentialStore, Credentials};

pub const DEFAULT_PROFILE: &str = "default";
const CREDENTIAL_DIR: &str = ".runpod";
const CREDENTIAL_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credential file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed credential file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// TOML-backed [`CredentialStore`], re-read on every lookup
#[derive(Debug, Clone)]
pub struct TomlCredentialStore {
    path: Option<PathBuf>,
    profile: String,
}

impl TomlCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }

    /// `<home>/.runpod/config.toml`; without a home directory the store is empty.
    pub fn default_location() -> Self {
        let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"));
        Self {
            path: home.map(|home| PathBuf::from(home).join(CREDENTIAL_DIR).join(CREDENTIAL_FILE)),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the configured profile. A missing file is not an error.
    pub fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Read {
                    path: path.clone(),
                    source,
                });
            }
        };

        let mut profiles: BTreeMap<String, BTreeMap<String, toml::Value>> =
            toml::from_str(&content).map_err(|source| CredentialError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok(profiles.remove(&self.profile).map(|fields| {
            fields
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        toml::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect()
        }))
    }
}

impl CredentialStore for TomlCredentialStore {
    fn get_credentials(&self) -> Option<Credentials> {
        match self.load() {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!(error = %err, "Ignoring unreadable credential file");
                None
            }
        }
    }
}

//! Authorization header resolution
//!
//! The API key is looked up through an ordered [`CredentialChain`]. Each
//! [`CredentialSource`] either answers (possibly with an empty key) or defers
//! to the next one. Header construction never fails: when no source answers
//! the `Authorization` value is the empty string, so callers that need a key
//! must check [`AuthHeaders::has_api_key`] themselves.

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;

use super::error::{HttpError, Result};
use super::user_agent::USER_AGENT;
use crate::credentials::TomlCredentialStore;

pub const API_KEY_ENV_VAR: &str = "RUNPOD_AI_API_KEY";

/// Credential profile returned by a [`CredentialStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    fields: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        self.with_field("api_key", api_key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.get("api_key")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, String)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Backend that knows the currently configured credentials
pub trait CredentialStore: Send + Sync {
    /// `None` (or empty credentials) when nothing is configured.
    fn get_credentials(&self) -> Option<Credentials>;
}

/// One link of the resolution chain.
///
/// `Some` ends the lookup, even when the key is empty. `None` defers to the
/// next source.
pub trait CredentialSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self) -> Option<String>;
}

/// Answers with the store's `api_key` whenever the store has a profile
pub struct StoreSource {
    store: Arc<dyn CredentialStore>,
}

impl StoreSource {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

impl CredentialSource for StoreSource {
    fn name(&self) -> &'static str {
        "credential_store"
    }

    fn resolve(&self) -> Option<String> {
        self.store
            .get_credentials()
            .filter(|credentials| !credentials.is_empty())
            .map(|credentials| credentials.api_key().unwrap_or_default().to_string())
    }
}

/// Reads an environment variable at resolution time
pub struct EnvSource {
    var: String,
}

impl EnvSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(API_KEY_ENV_VAR)
    }
}

impl CredentialSource for EnvSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn resolve(&self) -> Option<String> {
        env::var(&self.var).ok()
    }
}

/// Ordered list of credential sources, first answer wins
#[derive(Clone, Default)]
pub struct CredentialChain {
    sources: Vec<Arc<dyn CredentialSource>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credential file first, then `RUNPOD_AI_API_KEY`.
    pub fn default_chain() -> Self {
        Self::new()
            .with_source(StoreSource::new(Arc::new(TomlCredentialStore::default_location())))
            .with_source(EnvSource::default())
    }

    pub fn with_source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Resolve the API key, empty when no source answers.
    pub fn resolve_api_key(&self) -> String {
        for source in &self.sources {
            if let Some(key) = source.resolve() {
                debug!(source = source.name(), empty = key.is_empty(), "Resolved API key");
                return key;
            }
        }

        debug!("No credential source answered, using empty API key");
        String::new()
    }
}

/// The three headers attached to every outbound request, in send order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub content_type: String,
    pub authorization: String,
    pub user_agent: String,
}

impl AuthHeaders {
    pub fn has_api_key(&self) -> bool {
        !self.authorization.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Content-Type", self.content_type.as_str()),
            ("Authorization", self.authorization.as_str()),
            ("User-Agent", self.user_agent.as_str()),
        ]
        .into_iter()
    }

    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(3);
        for (key, (name, value)) in [header::CONTENT_TYPE, header::AUTHORIZATION, header::USER_AGENT]
            .into_iter()
            .zip(self.iter())
        {
            let value = HeaderValue::from_str(value)
                .map_err(|source| HttpError::InvalidHeader { name, source })?;
            headers.insert(key, value);
        }

        Ok(headers)
    }
}

/// Build the header set from the current credential state.
pub fn get_auth_header(chain: &CredentialChain) -> AuthHeaders {
    AuthHeaders {
        content_type: mime::APPLICATION_JSON.to_string(),
        authorization: chain.resolve_api_key(),
        user_agent: USER_AGENT.as_str().to_string(),
    }
}

//! Outbound HTTP for workers
//!
//! - [`get_auth_header`] - resolves the API key and renders the default headers
//! - [`AsyncSession`] / [`SyncSession`] - configured clients that trace every exchange
//! - [`HttpError`] - transport and status errors, with 429 kept distinct

pub mod auth;
mod error;
pub mod session;
pub mod trace;
pub mod user_agent;

pub use auth::{
    API_KEY_ENV_VAR, AuthHeaders, CredentialChain, CredentialSource, CredentialStore,
    Credentials, EnvSource, StoreSource, get_auth_header,
};
pub use error::{HttpError, Result};
pub use session::{AsyncSession, HttpTimeouts, SessionConfig, SyncSession, TracedResponse};
pub use user_agent::USER_AGENT;

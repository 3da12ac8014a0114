use thiserror::Error;

pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid runtime arguments: {0}")]
    Args(#[from] clap::Error),

    #[error("--test_input is not valid JSON: {0}")]
    TestInput(#[source] serde_json::Error),

    #[error("invalid worker settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("realtime server failed: {0}")]
    Server(#[from] std::io::Error),

    #[error("work loop failed: {0}")]
    WorkLoop(#[source] AnyError),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;

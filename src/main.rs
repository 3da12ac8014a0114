use runpod_worker::http::{AsyncSession, CredentialChain};
use runpod_worker::observability::{self, LogLevel};
use runpod_worker::serverless::{AnyError, Worker, WorkerConfig, work_loop_fn};
use serde_json::json;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = dotenvy::dotenv();
    let log_handle = observability::init_logging(LogLevel::Info)?;

    let worker = Worker::new(work_loop_fn(local_test_loop)).with_log_handle(log_handle);
    worker.start(WorkerConfig::new(), std::env::args()).await?;

    Ok(())
}

/// Runs `--test_input` once and prints the result; there is no job source.
async fn local_test_loop(config: WorkerConfig) -> Result<(), AnyError> {
    let session = AsyncSession::new(&CredentialChain::default_chain())?;
    if !session.auth_headers().has_api_key() {
        warn!("No RunPod API key configured");
    }

    match config.test_input() {
        Some(input) => {
            info!(debugger = config.debugger_enabled(), "Running local test input");
            println!("{}", serde_json::to_string_pretty(&json!({ "output": input }))?);
        }
        None => warn!("No --test_input given, nothing to run"),
    }

    Ok(())
}

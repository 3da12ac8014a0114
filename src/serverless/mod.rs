//! Serverless worker bootstrap
//!
//! [`Worker::start`] parses the runtime arguments into the [`WorkerConfig`],
//! reads the realtime settings from the environment, and then commits to one
//! of two modes for the rest of the process:
//!
//! - [`Mode::Realtime`] when `RUNPOD_REALTIME_PORT` is nonzero: the
//!   [`ApiServer`] gets the config and serves on that port.
//! - [`Mode::WorkLoop`] otherwise: the [`WorkLoop`] gets the config and is
//!   awaited until it exits.
//!
//! ## Example
//!
//! ```rust,ignore
//! use runpod_worker::serverless::{Worker, WorkerConfig, work_loop_fn};
//!
//! let worker = Worker::new(work_loop_fn(|config| async move {
//!     println!("{:?}", config.test_input());
//!     Ok(())
//! }));
//! worker.start(WorkerConfig::new(), std::env::args()).await?;
//! ```

pub mod args;
pub mod config;
mod error;
pub mod realtime;
pub mod settings;
pub mod work_loop;

use std::time::Instant;

use tracing::{info, warn};

use crate::observability::{LogHandle, LogLevel};

pub use args::{ParsedArgs, RuntimeArgs, parse_runtime_args, split_known_args};
pub use config::WorkerConfig;
pub use error::{AnyError, BootstrapError, Result};
pub use realtime::{ApiServer, RealtimeServer};
pub use settings::Settings;
pub use work_loop::{FnWorkLoop, WorkLoop, work_loop_fn};

/// Dispatch decision, made once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Realtime { port: u16, concurrency: usize },
    WorkLoop,
}

pub fn select_mode(settings: &Settings) -> Mode {
    match settings.realtime_port {
        0 => Mode::WorkLoop,
        port => Mode::Realtime {
            port,
            concurrency: settings.realtime_concurrency,
        },
    }
}

/// Store the parsed runtime arguments in `config` and apply the log level.
///
/// Fails on unparsable arguments or a `--test_input` that is not JSON.
pub fn set_config_args<I, T>(
    mut config: WorkerConfig,
    argv: I,
    log_handle: Option<&LogHandle>,
) -> Result<WorkerConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let ParsedArgs { args, residual } = parse_runtime_args(argv)?;
    config.rp_args = args;
    config.residual_args = residual;

    if let (Some(level), Some(handle)) = (config.rp_args.rp_log_level.as_deref(), log_handle) {
        apply_log_level(handle, level);
    }

    Ok(config)
}

fn apply_log_level(handle: &LogHandle, level: &str) {
    match level.parse::<LogLevel>() {
        Ok(level) => match handle.set_level(level) {
            Ok(()) => info!(%level, "Log level set"),
            Err(e) => warn!(error = %e, "Failed to apply log level"),
        },
        Err(e) => warn!(error = %e, "Keeping current log level"),
    }
}

/// Worker entry point holding both downstream consumers
pub struct Worker {
    work_loop: Box<dyn WorkLoop>,
    api_server: Box<dyn ApiServer>,
    log_handle: Option<LogHandle>,
}

impl Worker {
    /// Work loop for polling mode; realtime mode uses [`RealtimeServer`].
    pub fn new(work_loop: impl WorkLoop + 'static) -> Self {
        Self {
            work_loop: Box::new(work_loop),
            api_server: Box::new(RealtimeServer::new()),
            log_handle: None,
        }
    }

    pub fn with_api_server(mut self, api_server: impl ApiServer + 'static) -> Self {
        self.api_server = Box::new(api_server);
        self
    }

    pub fn with_log_handle(mut self, handle: LogHandle) -> Self {
        self.log_handle = Some(handle);
        self
    }

    /// Start with settings read from the process environment.
    pub async fn start<I, T>(self, config: WorkerConfig, argv: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let config = self.prepare(config, argv)?;
        let settings = Settings::from_env()?;
        self.dispatch(config, &settings).await
    }

    /// Start with explicit settings.
    pub async fn start_with_settings<I, T>(
        self,
        config: WorkerConfig,
        argv: I,
        settings: &Settings,
    ) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let config = self.prepare(config, argv)?;
        self.dispatch(config, settings).await
    }

    fn prepare<I, T>(&self, mut config: WorkerConfig, argv: I) -> Result<WorkerConfig>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        config.reference_counter_start = Instant::now();
        set_config_args(config, argv, self.log_handle.as_ref())
    }

    async fn dispatch(self, config: WorkerConfig, settings: &Settings) -> Result<()> {
        match select_mode(settings) {
            Mode::Realtime { port, concurrency } => {
                info!(port, concurrency, "Starting worker in realtime mode");
                let mut api_server = self.api_server;
                api_server.set_config(config);
                api_server.start(port, concurrency).await
            }
            Mode::WorkLoop => {
                info!("Starting worker work loop");
                self.work_loop
                    .run(config)
                    .await
                    .map_err(BootstrapError::WorkLoop)
            }
        }
    }
}

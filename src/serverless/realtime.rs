//! Realtime API server seam and its axum-backed default

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::json;
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{info, warn};

use super::config::WorkerConfig;
use super::error::Result;

/// Long-running server selected when a realtime port is configured
#[async_trait]
pub trait ApiServer: Send + Sync {
    fn set_config(&mut self, config: WorkerConfig);

    /// Serve on `port` until the process is asked to stop.
    async fn start(&self, port: u16, concurrency: usize) -> Result<()>;
}

#[derive(Clone)]
pub struct RealtimeState {
    pub config: Arc<WorkerConfig>,
}

pub struct RealtimeServer {
    host: IpAddr,
    config: Arc<WorkerConfig>,
}

impl Default for RealtimeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeServer {
    pub fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            config: Arc::new(WorkerConfig::new()),
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Routes shared by all requests, at most `concurrency` in flight.
    pub fn router(&self, concurrency: usize) -> Router {
        let state = RealtimeState {
            config: self.config.clone(),
        };

        Router::new()
            .route("/health", get(health))
            .with_state(state)
            .layer(RequestDecompressionLayer::new())
            .layer(GlobalConcurrencyLimitLayer::new(concurrency.max(1)))
    }

    /// Serve on an already bound listener.
    pub async fn serve(&self, listener: TcpListener, concurrency: usize) -> Result<()> {
        axum::serve(listener, self.router(concurrency).into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ApiServer for RealtimeServer {
    fn set_config(&mut self, config: WorkerConfig) {
        self.config = Arc::new(config);
    }

    async fn start(&self, port: u16, concurrency: usize) -> Result<()> {
        let address = SocketAddr::new(self.host, port);
        let listener = TcpListener::bind(address).await?;
        info!(%address, concurrency, "Realtime API listening");

        self.serve(listener, concurrency).await
    }
}

async fn health(State(state): State<RealtimeState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "uptime_ms": state.config.uptime().as_millis() as u64,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

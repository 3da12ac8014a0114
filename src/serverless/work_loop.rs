//! Polling work loop seam
//!
//! The job-fetching loop itself lives with the caller; the bootstrap only
//! needs something it can hand the config to and await.

use std::future::Future;

use async_trait::async_trait;

use super::config::WorkerConfig;
use super::error::AnyError;

#[async_trait]
pub trait WorkLoop: Send + Sync {
    /// Run until the loop exits. Errors end the process.
    async fn run(&self, config: WorkerConfig) -> Result<(), AnyError>;
}

/// [`WorkLoop`] backed by an async closure
pub struct FnWorkLoop<F> {
    f: F,
}

pub fn work_loop_fn<F, Fut>(f: F) -> FnWorkLoop<F>
where
    F: Fn(WorkerConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), AnyError>> + Send,
{
    FnWorkLoop { f }
}

#[async_trait]
impl<F, Fut> WorkLoop for FnWorkLoop<F>
where
    F: Fn(WorkerConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), AnyError>> + Send,
{
    async fn run(&self, config: WorkerConfig) -> Result<(), AnyError> {
        (self.f)(config).await
    }
}

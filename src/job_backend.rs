mod mock;
mod redis;

use crate::config;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use self::mock::MockJobBackend;
pub use self::redis::RedisJobBackend;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),
    #[error("Blocking job backend query failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Job backend unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view on the queues of the job processing backend.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Jobs currently being processed, summed over all worker processes.
    async fn busy_count(&self) -> Result<u64>;

    /// Jobs waiting in any of the named queues.
    async fn queued_count(&self) -> Result<u64>;

    /// Jobs scheduled for a retry before `boundary`.
    async fn retry_count_before(&self, boundary: DateTime<Utc>) -> Result<u64>;

    /// Deferred jobs scheduled to run before `boundary`.
    async fn scheduled_count_before(&self, boundary: DateTime<Utc>) -> Result<u64>;
}

pub fn build_from_config(config: &config::JobBackend) -> anyhow::Result<Arc<dyn JobBackend>> {
    Ok(match config {
        config::JobBackend::Mock {
            busy,
            queued,
            retries,
            scheduled,
        } => Arc::new(MockJobBackend::new(*busy, *queued, *retries, *scheduled)),
        config::JobBackend::Redis {
            url,
            namespace,
            timeout,
        } => Arc::new(RedisJobBackend::open(
            url,
            namespace.clone(),
            timeout.unwrap_or(self::redis::DEFAULT_TIMEOUT),
        )?),
    })
}

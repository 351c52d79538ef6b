use super::{JobBackend, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Reports a fixed load; used for dry runs without a Redis instance.
#[derive(Clone, Debug)]
pub struct MockJobBackend {
    busy: u64,
    queued: u64,
    retries: u64,
    scheduled: u64,
}

impl MockJobBackend {
    pub fn new(busy: u64, queued: u64, retries: u64, scheduled: u64) -> Self {
        Self {
            busy,
            queued,
            retries,
            scheduled,
        }
    }
}

#[async_trait]
impl JobBackend for MockJobBackend {
    async fn busy_count(&self) -> Result<u64> {
        Ok(self.busy)
    }

    async fn queued_count(&self) -> Result<u64> {
        Ok(self.queued)
    }

    async fn retry_count_before(&self, boundary: DateTime<Utc>) -> Result<u64> {
        debug!(%boundary, "Mock retry count");
        Ok(self.retries)
    }

    async fn scheduled_count_before(&self, boundary: DateTime<Utc>) -> Result<u64> {
        debug!(%boundary, "Mock scheduled count");
        Ok(self.scheduled)
    }
}

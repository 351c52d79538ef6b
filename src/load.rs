use crate::job_backend::{self, JobBackend};
use crate::scaling::MAX_LOOKAHEAD;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Load observed by one evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSnapshot {
    pub busy: u64,
    pub queued: u64,
    pub near_due_retries: u64,
    pub near_due_scheduled: u64,
    /// The evaluation was triggered by a job submission that may not be visible yet.
    pub adding_job: bool,
}

impl LoadSnapshot {
    pub fn pending_total(&self) -> u64 {
        self.busy
            .saturating_add(self.queued)
            .saturating_add(self.near_due_retries)
            .saturating_add(self.near_due_scheduled)
            .saturating_add(u64::from(self.adding_job))
    }
}

pub struct LoadSampler {
    backend: Arc<dyn JobBackend>,
    lookahead: Duration,
}

impl LoadSampler {
    pub fn new(backend: Arc<dyn JobBackend>, lookahead: Duration) -> Self {
        Self { backend, lookahead }
    }

    pub async fn sample(&self, adding_job: bool) -> job_backend::Result<LoadSnapshot> {
        // capped so the boundary cannot overflow
        let lookahead = chrono::Duration::from_std(self.lookahead.min(MAX_LOOKAHEAD))
            .unwrap_or_else(|_| chrono::Duration::zero());

        self.sample_at(Utc::now() + lookahead, adding_job).await
    }

    #[tracing::instrument(name = "LoadSampler::sample_at", skip(self))]
    pub async fn sample_at(
        &self,
        boundary: DateTime<Utc>,
        adding_job: bool,
    ) -> job_backend::Result<LoadSnapshot> {
        let (busy, queued, near_due_retries, near_due_scheduled) = futures::try_join!(
            self.backend.busy_count(),
            self.backend.queued_count(),
            self.backend.retry_count_before(boundary),
            self.backend.scheduled_count_before(boundary)
        )?;

        let snapshot = LoadSnapshot {
            busy,
            queued,
            near_due_retries,
            near_due_scheduled,
            adding_job,
        };

        debug!(?snapshot, pending_total = snapshot.pending_total(), "Sampled load");

        Ok(snapshot)
    }
}

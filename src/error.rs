use crate::{job_backend, platform};
use tracing_error::SpanTrace;

/// Failure of a single scaling evaluation, carrying the span it happened in.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    #[source]
    kind: ErrorKind,
    span_trace: SpanTrace,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Failed to sample load: {0}")]
    Sampling(#[from] job_backend::Error),
    #[error("Failed to reconcile fleet: {0}")]
    Provisioning(#[from] platform::Error),
    #[error("Evaluation timed out: {0}")]
    TimedOut(#[from] tokio::time::Elapsed),
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(source: E) -> Self {
        Self {
            kind: ErrorKind::from(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

use crate::autoscaler::AutoscalerHandle;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Job payload as it is pushed onto a queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub class: String,
    pub jid: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<f64>,
}

/// Hook wrapped around every job submission of the enqueuing client.
///
/// Implementations have to call `next` exactly once and hand its result back.
pub trait ClientMiddleware<C> {
    fn call<F, R>(&self, job: &JobDescriptor, queue: &str, connection: &C, next: F) -> R
    where
        F: FnOnce() -> R;
}

/// Requests a scaling evaluation for every submitted job.
///
/// Submission is never delayed by the evaluation and never sees its failures.
#[derive(Clone)]
pub struct ScalingTrigger {
    autoscaler: AutoscalerHandle,
}

impl ScalingTrigger {
    pub fn new(autoscaler: AutoscalerHandle) -> Self {
        Self { autoscaler }
    }
}

impl<C> ClientMiddleware<C> for ScalingTrigger {
    fn call<F, R>(&self, job: &JobDescriptor, queue: &str, _connection: &C, next: F) -> R
    where
        F: FnOnce() -> R,
    {
        trace!(class = %job.class, jid = %job.jid, queue, "Job submitted");
        self.autoscaler.request_evaluation(true);

        next()
    }
}

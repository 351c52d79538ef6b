use crate::config::Config;
use crate::error::Error;
use crate::error_reporter::{self, ErrorReporter};
use crate::load::{LoadSampler, LoadSnapshot};
use crate::platform::{self, MockPlatform, Platform};
use crate::reconciler::{FleetReconciler, Reconciliation};
use crate::scaling::{self, Activation, ScalingConfig, ScalingDecision};
use crate::{actor, job_backend};
use act_zero::runtimes::tokio::{spawn_actor, Timer};
use act_zero::timer::Tick;
use act_zero::{send, Actor, ActorError, ActorResult, Addr, Produces, WeakAddr};
use anyhow::Context;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const REPORT_MESSAGE: &str = "Worker autoscaling error";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evaluation {
    Inactive,
    Completed {
        load: LoadSnapshot,
        decision: ScalingDecision,
        reconciliation: Reconciliation,
    },
    Failed {
        message: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    pub inactive: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Coalesces evaluation requests into at most one queued evaluation.
///
/// Requests arriving while an evaluation is queued are folded into it; their
/// `adding_job` flags are or-ed. Both flags live in one atomic so a request's
/// `adding_job` always travels with the pending evaluation it belongs to.
#[derive(Clone, Debug, Default)]
pub struct EvaluationRequests {
    state: Arc<AtomicU8>,
}

const PENDING: u8 = 0b01;
const ADDING_JOB: u8 = 0b10;

impl EvaluationRequests {
    /// Records a request; returns `true` if the caller has to enqueue an evaluation.
    pub fn request(&self, adding_job: bool) -> bool {
        let flags = if adding_job { PENDING | ADDING_JOB } else { PENDING };

        self.state.fetch_or(flags, Ordering::SeqCst) & PENDING == 0
    }

    /// Claims the queued request, yielding its `adding_job` flag.
    pub fn take(&self) -> Option<bool> {
        let state = self.state.swap(0, Ordering::SeqCst);

        if state & PENDING != 0 {
            Some(state & ADDING_JOB != 0)
        } else {
            None
        }
    }
}

pub struct Autoscaler {
    sampler: LoadSampler,
    scaling: Arc<ScalingConfig>,
    reconciler: FleetReconciler,
    activation: Activation,
    reporter: Arc<dyn ErrorReporter>,
    requests: EvaluationRequests,
    evaluation_interval: Option<Duration>,
    evaluation_timeout: Duration,
    stats: EvaluationStats,
    timer: Timer,
    addr: WeakAddr<Self>,
}

/// Cheap, cloneable entry point for requesting evaluations from any thread.
#[derive(Clone)]
pub struct AutoscalerHandle {
    addr: Addr<Autoscaler>,
    requests: EvaluationRequests,
}

impl AutoscalerHandle {
    /// Queues an evaluation without waiting for it.
    pub fn request_evaluation(&self, adding_job: bool) {
        if self.requests.request(adding_job) {
            send!(self.addr.evaluate());
        } else {
            debug!(adding_job, "Coalesced evaluation request");
        }
    }

    pub fn addr(&self) -> &Addr<Autoscaler> {
        &self.addr
    }
}

impl Autoscaler {
    pub fn new(
        sampler: LoadSampler,
        scaling: Arc<ScalingConfig>,
        reconciler: FleetReconciler,
        activation: Activation,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            sampler,
            scaling,
            reconciler,
            activation,
            reporter,
            requests: Default::default(),
            evaluation_interval: None,
            evaluation_timeout: scaling::DEFAULT_EVALUATION_TIMEOUT,
            stats: Default::default(),
            timer: Default::default(),
            addr: Default::default(),
        }
    }

    pub fn with_evaluation_interval(mut self, interval: Option<Duration>) -> Self {
        self.evaluation_interval = interval;
        self
    }

    /// Upper bound for one evaluation; a hung backend or platform call fails the
    /// evaluation instead of stalling the mailbox.
    pub fn with_evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    pub fn spawn(self) -> AutoscalerHandle {
        let requests = self.requests.clone();

        AutoscalerHandle {
            addr: spawn_actor(self),
            requests,
        }
    }

    async fn evaluate(&mut self) -> ActorResult<()> {
        if let Some(adding_job) = self.requests.take() {
            self.guarded_evaluation(adding_job).await;
        }

        Produces::ok(())
    }

    /// Runs an evaluation right away and hands back its outcome.
    pub async fn evaluate_now(&mut self, adding_job: bool) -> ActorResult<Evaluation> {
        Produces::ok(self.guarded_evaluation(adding_job).await)
    }

    pub async fn stats(&mut self) -> ActorResult<EvaluationStats> {
        Produces::ok(self.stats)
    }

    #[tracing::instrument(name = "Autoscaler::evaluation", skip(self))]
    async fn guarded_evaluation(&mut self, adding_job: bool) -> Evaluation {
        if !self.activation.is_active() {
            debug!("Autoscaling is not activated");
            self.stats.inactive += 1;

            return Evaluation::Inactive;
        }

        let evaluation = tokio::time::timeout(
            self.evaluation_timeout,
            run_evaluation(&self.sampler, &self.scaling, &self.reconciler, adding_job),
        );
        let outcome = AssertUnwindSafe(evaluation)
            .catch_unwind()
            .await
            .map(|result| result.map_err(Error::from).and_then(|evaluation| evaluation));

        let message = match outcome {
            Ok(Ok(evaluation)) => {
                self.stats.completed += 1;

                return evaluation;
            }
            Ok(Err(e)) => {
                error!(
                    "Failed to scale workers: {} SpanTrace: {}",
                    e,
                    e.span_trace()
                );
                e.to_string()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Scaling evaluation panicked: {}", message);
                message
            }
        };

        let mut context = HashMap::new();
        context.insert("error".to_owned(), message.clone());
        self.reporter.report_message(REPORT_MESSAGE, context);
        self.stats.failed += 1;

        Evaluation::Failed { message }
    }
}

impl fmt::Debug for Autoscaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autoscaler")
            .field("scaling", &self.scaling)
            .field("activation", &self.activation)
            .field("stats", &self.stats)
            .finish()
    }
}

#[async_trait]
impl Actor for Autoscaler {
    async fn started(&mut self, addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!(
            active = self.activation.is_active(),
            interval = ?self.evaluation_interval,
            "Started"
        );

        self.addr = addr.downgrade();

        if let Some(interval) = self.evaluation_interval {
            self.timer.set_interval_weak(self.addr.clone(), interval);
        }

        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        actor::handle_error(error)
    }
}

#[async_trait]
impl Tick for Autoscaler {
    async fn tick(&mut self) -> ActorResult<()> {
        if self.timer.tick() && self.requests.request(false) {
            send!(self.addr.evaluate());
        }

        Produces::ok(())
    }
}

async fn run_evaluation(
    sampler: &LoadSampler,
    config: &ScalingConfig,
    reconciler: &FleetReconciler,
    adding_job: bool,
) -> Result<Evaluation, Error> {
    let load = sampler.sample(adding_job).await?;
    let decision = scaling::decide(load.pending_total(), config);

    debug!(
        pending_total = load.pending_total(),
        target_workers = decision.target_workers,
        "Decided fleet size"
    );

    let reconciliation = reconciler.reconcile(decision.target_workers).await?;

    Ok(Evaluation::Completed {
        load,
        decision,
        reconciliation,
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

pub fn build_from_config(config: &Config) -> anyhow::Result<Autoscaler> {
    let scaling = Arc::new(
        ScalingConfig::from_options(&config.scaling).context("Invalid scaling configuration")?,
    );
    let activation = Activation::new(config.activation.enabled, config.platform.credential());

    // an inactive autoscaler never talks to the platform
    let (platform, app_name): (Arc<dyn Platform>, String) = if activation.is_active() {
        let app_name = config
            .platform
            .app_name()
            .context("Missing platform app name")?;

        (
            platform::build_from_config(&config.platform)?,
            app_name.to_owned(),
        )
    } else {
        (
            Arc::new(MockPlatform::default()),
            config.platform.app_name().unwrap_or_default().to_owned(),
        )
    };

    let sampler = LoadSampler::new(
        job_backend::build_from_config(&config.job_backend)?,
        config.scaling.lookahead(),
    );
    let reconciler = FleetReconciler::new(platform, app_name, scaling.dyno_type.clone());
    let reporter = error_reporter::build_from_config(&config.error_reporter)?;

    Ok(
        Autoscaler::new(sampler, scaling, reconciler, activation, reporter)
            .with_evaluation_interval(config.scaling.evaluation_interval)
            .with_evaluation_timeout(config.scaling.evaluation_timeout()),
    )
}

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MIN_WORKERS: u64 = 1;
pub const DEFAULT_MAX_WORKERS: u64 = 5;
pub const DEFAULT_DYNO_TYPE: &str = "background";
pub const DEFAULT_WORKER_CAPACITY: u64 = 7;
pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_secs(5 * 60);
pub const MAX_LOOKAHEAD: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_secs(60);
/// Interval used by the standalone binary when none is configured.
pub const DEFAULT_EVALUATION_INTERVAL: Duration = Duration::from_secs(30);

/// Bounds and capacity used to turn pending work into a worker count.
///
/// Built once at startup via [`ScalingConfig::from_options`] and shared read-only
/// afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalingConfig {
    pub min_workers: u64,
    pub max_workers: u64,
    pub dyno_type: String,
    pub worker_capacity: u64,
}

/// Partial scaling settings; unset fields fall back to the defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScalingOptions {
    pub min_workers: Option<u64>,
    pub max_workers: Option<u64>,
    pub dyno_type: Option<String>,
    pub worker_capacity: Option<u64>,
    #[serde(with = "humantime_serde")]
    pub lookahead: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub evaluation_interval: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub evaluation_timeout: Option<Duration>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker capacity must be greater than zero")]
    InvalidCapacity,
    #[error("max workers {max} is lower than min workers {min}")]
    InvalidBounds { min: u64, max: u64 },
    #[error("lookahead {0:?} exceeds the maximum of seven days")]
    InvalidLookahead(Duration),
    #[error("evaluation timeout must be greater than zero")]
    InvalidTimeout,
}

impl ScalingOptions {
    /// Overlays `overrides` on top of `self`; every field set in `overrides` wins.
    pub fn merge(self, overrides: ScalingOptions) -> Self {
        Self {
            min_workers: overrides.min_workers.or(self.min_workers),
            max_workers: overrides.max_workers.or(self.max_workers),
            dyno_type: overrides.dyno_type.or(self.dyno_type),
            worker_capacity: overrides.worker_capacity.or(self.worker_capacity),
            lookahead: overrides.lookahead.or(self.lookahead),
            evaluation_interval: overrides.evaluation_interval.or(self.evaluation_interval),
            evaluation_timeout: overrides.evaluation_timeout.or(self.evaluation_timeout),
        }
    }

    pub fn lookahead(&self) -> Duration {
        self.lookahead.unwrap_or(DEFAULT_LOOKAHEAD)
    }

    pub fn evaluation_timeout(&self) -> Duration {
        self.evaluation_timeout.unwrap_or(DEFAULT_EVALUATION_TIMEOUT)
    }

    /// Periodic interval for a process that receives no job submissions of its own.
    pub fn standalone_interval(&self) -> Duration {
        self.evaluation_interval.unwrap_or(DEFAULT_EVALUATION_INTERVAL)
    }
}

impl ScalingConfig {
    pub fn from_options(options: &ScalingOptions) -> Result<Self, ConfigError> {
        let config = Self {
            min_workers: options.min_workers.unwrap_or(DEFAULT_MIN_WORKERS),
            max_workers: options.max_workers.unwrap_or(DEFAULT_MAX_WORKERS),
            dyno_type: options
                .dyno_type
                .clone()
                .unwrap_or_else(|| DEFAULT_DYNO_TYPE.to_owned()),
            worker_capacity: options.worker_capacity.unwrap_or(DEFAULT_WORKER_CAPACITY),
        };

        if config.worker_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }

        if config.max_workers < config.min_workers {
            return Err(ConfigError::InvalidBounds {
                min: config.min_workers,
                max: config.max_workers,
            });
        }

        if options.lookahead() > MAX_LOOKAHEAD {
            return Err(ConfigError::InvalidLookahead(options.lookahead()));
        }

        if options.evaluation_timeout() == Duration::from_secs(0) {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(config)
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            dyno_type: DEFAULT_DYNO_TYPE.to_owned(),
            worker_capacity: DEFAULT_WORKER_CAPACITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalingDecision {
    pub target_workers: u64,
}

/// Translates pending work into a worker count within `[min_workers, max_workers]`.
pub fn target_workers(pending_total: u64, config: &ScalingConfig) -> u64 {
    let capacity = config.worker_capacity;
    let raw_target = pending_total / capacity + u64::from(pending_total % capacity != 0);

    raw_target.clamp(config.min_workers, config.max_workers)
}

pub fn decide(pending_total: u64, config: &ScalingConfig) -> ScalingDecision {
    ScalingDecision {
        target_workers: target_workers(pending_total, config),
    }
}

/// Gate for the whole control loop: a provisioning credential and the enablement flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Activation {
    enabled: bool,
    has_credential: bool,
}

impl Activation {
    pub fn new(enabled: bool, credential: Option<&str>) -> Self {
        Self {
            enabled,
            has_credential: credential.map_or(false, |c| !c.trim().is_empty()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.has_credential
    }
}

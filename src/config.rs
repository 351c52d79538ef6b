use crate::scaling::ScalingOptions;
use crate::AppConfig;
use anyhow::Context;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub scaling: ScalingOptions,
    pub activation: Activation,
    pub platform: Platform,
    pub job_backend: JobBackend,
    pub error_reporter: ErrorReporter,
}

#[derive(Deserialize, Debug, Default, Clone, Copy)]
#[serde(default)]
pub struct Activation {
    pub enabled: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Platform {
    Mock {
        app_name: Option<String>,
        #[serde(default)]
        maintenance: bool,
        #[serde(default)]
        fleet_size: u64,
    },
    Heroku {
        address: Option<String>,
        api_token: Option<String>,
        app_name: Option<String>,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Heroku {
            address: None,
            api_token: None,
            app_name: None,
            timeout: None,
        }
    }
}

impl Platform {
    /// Credential that authorizes provisioning calls, if any.
    pub fn credential(&self) -> Option<&str> {
        match self {
            Platform::Mock { .. } => Some("mock"),
            Platform::Heroku { api_token, .. } => api_token.as_deref(),
        }
    }

    pub fn app_name(&self) -> Option<&str> {
        match self {
            Platform::Mock { app_name, .. } | Platform::Heroku { app_name, .. } => {
                app_name.as_deref().filter(|name| !name.is_empty())
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobBackend {
    Mock {
        #[serde(default)]
        busy: u64,
        #[serde(default)]
        queued: u64,
        #[serde(default)]
        retries: u64,
        #[serde(default)]
        scheduled: u64,
    },
    Redis {
        #[serde(default = "default_redis_url")]
        url: String,
        namespace: Option<String>,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
}

impl Default for JobBackend {
    fn default() -> Self {
        JobBackend::Redis {
            url: default_redis_url(),
            namespace: None,
            timeout: None,
        }
    }
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_owned()
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ErrorReporter {
    Log,
    Webhook {
        url: String,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
}

impl Default for ErrorReporter {
    fn default() -> Self {
        ErrorReporter::Log
    }
}

const MIN_WORKERS: &[&str] = &["AUTOSCALER_MIN_WORKERS", "SIDEKIQ_HEROKU_AUTOSCALER_MIN_WORKERS"];
const MAX_WORKERS: &[&str] = &["AUTOSCALER_MAX_WORKERS", "SIDEKIQ_HEROKU_AUTOSCALER_MAX_WORKERS"];
const DYNO_TYPE: &[&str] = &["AUTOSCALER_DYNO_TYPE"];
const WORKER_CAPACITY: &[&str] = &["AUTOSCALER_WORKER_CAPACITY", "SIDEKIQ_CONCURRENCY"];
const LOOKAHEAD_MINUTES: &[&str] = &[
    "AUTOSCALER_LOOKAHEAD_MINUTES",
    "SIDEKIQ_HEROKU_AUTOSCALER_PERIOD",
];
const EVALUATION_INTERVAL_SECONDS: &[&str] = &["AUTOSCALER_EVALUATION_INTERVAL_SECONDS"];
const EVALUATION_TIMEOUT_SECONDS: &[&str] = &["AUTOSCALER_EVALUATION_TIMEOUT_SECONDS"];
const ENABLED: &[&str] = &["AUTOSCALER_ENABLED", "HEROKU_ENV"];
const API_TOKEN: &[&str] = &["HEROKU_API_TOKEN", "HEROKU_ACCESS_TOKEN"];
const APP_NAME: &[&str] = &["HEROKU_APP_NAME"];
const REDIS_URL: &[&str] = &["REDIS_URL"];

impl Config {
    /// Applies environment overrides on top of the file configuration.
    ///
    /// Each setting accepts its `AUTOSCALER_*`/`HEROKU_*` name and the legacy
    /// `SIDEKIQ_*`/`HEROKU_*` names; the first listed name that is set wins.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let overrides = ScalingOptions {
            min_workers: parse_var(&lookup, MIN_WORKERS)?,
            max_workers: parse_var(&lookup, MAX_WORKERS)?,
            dyno_type: first_var(&lookup, DYNO_TYPE).map(|(_, value)| value),
            worker_capacity: parse_var(&lookup, WORKER_CAPACITY)?,
            lookahead: parse_var::<u64, _>(&lookup, LOOKAHEAD_MINUTES)?
                .map(|minutes| Duration::from_secs(minutes.saturating_mul(60))),
            evaluation_interval: parse_var(&lookup, EVALUATION_INTERVAL_SECONDS)?
                .map(Duration::from_secs),
            evaluation_timeout: parse_var(&lookup, EVALUATION_TIMEOUT_SECONDS)?
                .map(Duration::from_secs),
        };
        self.scaling = std::mem::take(&mut self.scaling).merge(overrides);

        if let Some((_, enabled)) = first_var(&lookup, ENABLED) {
            self.activation.enabled = enabled.trim() == "true";
        }

        let app_name_override = first_var(&lookup, APP_NAME).map(|(_, value)| value);
        match &mut self.platform {
            Platform::Heroku {
                api_token,
                app_name,
                ..
            } => {
                if let Some((_, token)) = first_var(&lookup, API_TOKEN) {
                    *api_token = Some(token);
                }

                if let Some(name) = app_name_override {
                    *app_name = Some(name);
                }
            }
            Platform::Mock { app_name, .. } => {
                if let Some(name) = app_name_override {
                    *app_name = Some(name);
                }
            }
        }

        if let (JobBackend::Redis { url, .. }, Some((_, redis_url))) =
            (&mut self.job_backend, first_var(&lookup, REDIS_URL))
        {
            *url = redis_url;
        }

        Ok(())
    }
}

fn first_var<L>(lookup: &L, names: &[&'static str]) -> Option<(&'static str, String)>
where
    L: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .find_map(|&name| lookup(name).map(|value| (name, value)))
}

fn parse_var<T, L>(lookup: &L, names: &[&'static str]) -> anyhow::Result<Option<T>>
where
    L: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    first_var(lookup, names)
        .map(|(name, value)| {
            value
                .trim()
                .parse()
                .with_context(|| format!("Invalid value {:?} for {}", value, name))
        })
        .transpose()
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let mut config = match get_config_path() {
        Some(config_path) => read_config_file(&config_path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => read_config_file(DEFAULT_CONFIG_PATH)?,
        None => {
            tracing::info!("No config file found, using defaults");
            Config::default()
        }
    };

    config.apply_env(|name| std::env::var(name).ok())?;

    Ok(Arc::new(config))
}

fn read_config_file(config_path: &str) -> anyhow::Result<Config> {
    let file = File::open(config_path)
        .with_context(|| format!("Failed to open config file {}", config_path))?;

    serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config file {}", config_path))
}

fn get_config_path() -> Option<String> {
    use std::env;
    use tracing::info;

    env::var("APP_CONFIG")
        .map_err(|e| {
            info!(
                error = format!("{:?}", e).as_str(),
                "Missing or invalid APP_CONFIG env var, fallback to config.yml"
            );
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_full_config() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = serde_yaml::from_str(
            r#"
scaling:
  min_workers: 2
  max_workers: 8
  dyno_type: worker
  worker_capacity: 10
  lookahead: 2m
  evaluation_interval: 30s
activation:
  enabled: true
platform:
  type: heroku
  api_token: secret
  app_name: demo
  timeout: 5s
job_backend:
  type: redis
  url: redis://cache:6379/1
  namespace: jobs
error_reporter:
  type: webhook
  url: https://errors.example.com/report
"#,
        )?;

        assert_eq!(Some(2), config.scaling.min_workers);
        assert_eq!(Some("worker".to_owned()), config.scaling.dyno_type);
        assert_eq!(Duration::from_secs(120), config.scaling.lookahead());
        assert_eq!(
            Some(Duration::from_secs(30)),
            config.scaling.evaluation_interval
        );
        assert!(config.activation.enabled);
        assert_eq!(Some("secret"), config.platform.credential());
        assert_eq!(Some("demo"), config.platform.app_name());
        assert!(matches!(
            config.job_backend,
            JobBackend::Redis { ref namespace, .. } if namespace.as_deref() == Some("jobs")
        ));
        assert!(matches!(config.error_reporter, ErrorReporter::Webhook { .. }));

        Ok(())
    }

    #[test]
    fn test_empty_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = serde_yaml::from_str("{}")?;

        assert_eq!(ScalingOptions::default(), config.scaling);
        assert!(!config.activation.enabled);
        assert_eq!(None, config.platform.credential());
        assert!(matches!(
            config.job_backend,
            JobBackend::Redis { ref url, .. } if url == DEFAULT_REDIS_URL
        ));
        assert!(matches!(config.error_reporter, ErrorReporter::Log));

        Ok(())
    }

    #[test]
    fn test_env_overrides_file_values() -> Result<(), Box<dyn std::error::Error>> {
        let mut config: Config = serde_yaml::from_str(
            r#"
scaling:
  min_workers: 2
  max_workers: 8
"#,
        )?;

        config.apply_env(env(&[
            ("AUTOSCALER_MAX_WORKERS", "12"),
            ("AUTOSCALER_LOOKAHEAD_MINUTES", "10"),
            ("AUTOSCALER_ENABLED", "true"),
            ("HEROKU_API_TOKEN", "token"),
            ("HEROKU_APP_NAME", "demo"),
            ("REDIS_URL", "redis://queue:6379"),
        ]))?;

        assert_eq!(Some(2), config.scaling.min_workers);
        assert_eq!(Some(12), config.scaling.max_workers);
        assert_eq!(Duration::from_secs(600), config.scaling.lookahead());
        assert!(config.activation.enabled);
        assert_eq!(Some("token"), config.platform.credential());
        assert_eq!(Some("demo"), config.platform.app_name());
        assert!(matches!(
            config.job_backend,
            JobBackend::Redis { ref url, .. } if url == "redis://queue:6379"
        ));

        Ok(())
    }

    #[test]
    fn test_enabled_requires_literal_true() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = Config {
            activation: Activation { enabled: true },
            ..Default::default()
        };

        config.apply_env(env(&[("AUTOSCALER_ENABLED", "yes")]))?;

        assert!(!config.activation.enabled);

        Ok(())
    }

    #[test]
    fn test_unparsable_number_is_an_error() {
        let mut config = Config::default();

        assert!(config
            .apply_env(env(&[("AUTOSCALER_WORKER_CAPACITY", "seven")]))
            .is_err());
    }

    #[test]
    fn test_legacy_names_are_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = Config::default();

        config.apply_env(env(&[
            ("SIDEKIQ_HEROKU_AUTOSCALER_MIN_WORKERS", "2"),
            ("SIDEKIQ_HEROKU_AUTOSCALER_MAX_WORKERS", "9"),
            ("SIDEKIQ_CONCURRENCY", "10"),
            ("SIDEKIQ_HEROKU_AUTOSCALER_PERIOD", "3"),
            ("HEROKU_ENV", "true"),
            ("HEROKU_ACCESS_TOKEN", "legacy-token"),
        ]))?;

        assert_eq!(Some(2), config.scaling.min_workers);
        assert_eq!(Some(9), config.scaling.max_workers);
        assert_eq!(Some(10), config.scaling.worker_capacity);
        assert_eq!(Duration::from_secs(180), config.scaling.lookahead());
        assert!(config.activation.enabled);
        assert_eq!(Some("legacy-token"), config.platform.credential());

        Ok(())
    }

    #[test]
    fn test_current_names_win_over_legacy_names() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = Config::default();

        config.apply_env(env(&[
            ("AUTOSCALER_WORKER_CAPACITY", "4"),
            ("SIDEKIQ_CONCURRENCY", "10"),
            ("HEROKU_API_TOKEN", "token"),
            ("HEROKU_ACCESS_TOKEN", "legacy-token"),
            ("AUTOSCALER_ENABLED", "false"),
            ("HEROKU_ENV", "true"),
        ]))?;

        assert_eq!(Some(4), config.scaling.worker_capacity);
        assert_eq!(Some("token"), config.platform.credential());
        assert!(!config.activation.enabled);

        Ok(())
    }

    #[test]
    fn test_unparsable_legacy_number_names_the_variable() {
        let mut config = Config::default();

        let error = config
            .apply_env(env(&[("SIDEKIQ_CONCURRENCY", "many")]))
            .unwrap_err();

        assert!(error.to_string().contains("SIDEKIQ_CONCURRENCY"));
    }

    #[test]
    fn test_evaluation_interval_and_timeout_from_env() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = Config::default();

        config.apply_env(env(&[
            ("AUTOSCALER_EVALUATION_INTERVAL_SECONDS", "15"),
            ("AUTOSCALER_EVALUATION_TIMEOUT_SECONDS", "20"),
        ]))?;

        assert_eq!(
            Some(Duration::from_secs(15)),
            config.scaling.evaluation_interval
        );
        assert_eq!(Duration::from_secs(15), config.scaling.standalone_interval());
        assert_eq!(Duration::from_secs(20), config.scaling.evaluation_timeout());

        Ok(())
    }

    #[test]
    fn test_redis_timeout() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = serde_yaml::from_str(
            r#"
job_backend:
  type: redis
  timeout: 2s
"#,
        )?;

        assert!(matches!(
            config.job_backend,
            JobBackend::Redis { timeout: Some(t), ref url, .. }
                if t == Duration::from_secs(2) && url == DEFAULT_REDIS_URL
        ));

        Ok(())
    }

    #[test]
    fn test_mock_platform_has_credential() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = serde_yaml::from_str(
            r#"
platform:
  type: mock
  fleet_size: 3
"#,
        )?;

        assert_eq!(Some("mock"), config.platform.credential());
        assert_eq!(None, config.platform.app_name());

        Ok(())
    }
}

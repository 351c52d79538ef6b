use super::{JobBackend, Result};
use ::redis::{Cmd, Connection, Pipeline, RedisResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads load signals from the Redis data layout of a Sidekiq installation.
pub struct RedisJobBackend {
    client: ::redis::Client,
    keys: Arc<Keys>,
    timeout: Duration,
}

impl RedisJobBackend {
    pub fn open(url: &str, namespace: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ::redis::Client::open(url)?,
            keys: Arc::new(Keys::new(namespace)),
            timeout,
        })
    }

    async fn query<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection, &Keys) -> RedisResult<T> + Send + 'static,
    {
        let client = self.client.clone();
        let keys = Arc::clone(&self.keys);
        let timeout = self.timeout;

        let result = tokio::task::spawn_blocking(move || {
            let mut connection = client.get_connection_with_timeout(timeout)?;
            connection.set_read_timeout(Some(timeout))?;
            connection.set_write_timeout(Some(timeout))?;

            f(&mut connection, &keys)
        })
        .await?;

        Ok(result?)
    }
}

impl fmt::Debug for RedisJobBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RedisJobBackend ({:?}, timeout {:?})",
            self.keys.namespace, self.timeout
        )
    }
}

#[async_trait]
impl JobBackend for RedisJobBackend {
    #[tracing::instrument(name = "RedisJobBackend::busy_count", skip(self))]
    async fn busy_count(&self) -> Result<u64> {
        self.query(|connection, keys| {
            let identities: Vec<String> = members_cmd(&keys.processes()).query(connection)?;
            if identities.is_empty() {
                return Ok(0);
            }

            let busy: Vec<Option<u64>> = busy_pipeline(keys, &identities).query(connection)?;
            debug!(processes = identities.len(), "Fetched busy counts");

            Ok(sum_busy(busy))
        })
        .await
    }

    #[tracing::instrument(name = "RedisJobBackend::queued_count", skip(self))]
    async fn queued_count(&self) -> Result<u64> {
        self.query(|connection, keys| {
            let queues: Vec<String> = members_cmd(&keys.queues()).query(connection)?;
            if queues.is_empty() {
                return Ok(0);
            }

            let lengths: Vec<u64> = queued_pipeline(keys, &queues).query(connection)?;

            Ok(lengths.into_iter().sum())
        })
        .await
    }

    #[tracing::instrument(name = "RedisJobBackend::retry_count_before", skip(self))]
    async fn retry_count_before(&self, boundary: DateTime<Utc>) -> Result<u64> {
        self.query(move |connection, keys| {
            count_before_cmd(&keys.retry(), boundary).query(connection)
        })
        .await
    }

    #[tracing::instrument(name = "RedisJobBackend::scheduled_count_before", skip(self))]
    async fn scheduled_count_before(&self, boundary: DateTime<Utc>) -> Result<u64> {
        self.query(move |connection, keys| {
            count_before_cmd(&keys.schedule(), boundary).query(connection)
        })
        .await
    }
}

fn members_cmd(key: &str) -> Cmd {
    let mut cmd = ::redis::cmd("SMEMBERS");
    cmd.arg(key);
    cmd
}

fn busy_pipeline(keys: &Keys, identities: &[String]) -> Pipeline {
    let mut pipe = ::redis::pipe();
    for identity in identities {
        pipe.cmd("HGET").arg(keys.key(identity)).arg("busy");
    }
    pipe
}

fn queued_pipeline(keys: &Keys, queues: &[String]) -> Pipeline {
    let mut pipe = ::redis::pipe();
    for queue in queues {
        pipe.cmd("LLEN").arg(keys.queue(queue));
    }
    pipe
}

/// Processes that vanished since `SMEMBERS` answer with nil and count as idle.
fn sum_busy(busy: Vec<Option<u64>>) -> u64 {
    busy.into_iter().flatten().sum()
}

fn count_before_cmd(key: &str, boundary: DateTime<Utc>) -> Cmd {
    let mut cmd = ::redis::cmd("ZCOUNT");
    cmd.arg(key).arg("-inf").arg(exclusive_score(boundary));
    cmd
}

/// Sorted sets are scored with epoch seconds; `(` makes the upper bound exclusive.
fn exclusive_score(boundary: DateTime<Utc>) -> String {
    let score = boundary.timestamp_millis() as f64 / 1000.0;

    format!("({}", score)
}

#[derive(Debug)]
struct Keys {
    namespace: Option<String>,
}

impl Keys {
    fn new(namespace: Option<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()),
        }
    }

    fn key(&self, name: &str) -> String {
        match self.namespace.as_ref() {
            Some(ns) => format!("{}:{}", ns, name),
            None => name.to_owned(),
        }
    }

    fn processes(&self) -> String {
        self.key("processes")
    }

    fn queues(&self) -> String {
        self.key("queues")
    }

    fn queue(&self, name: &str) -> String {
        self.key(&format!("queue:{}", name))
    }

    fn retry(&self) -> String {
        self.key("retry")
    }

    fn schedule(&self) -> String {
        self.key("schedule")
    }
}

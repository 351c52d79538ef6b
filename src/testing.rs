use crate::error_reporter::ErrorReporter;
use crate::job_backend::{self, JobBackend};
use crate::platform::{self, AppInfo, Platform};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeJobBackend {
    counts: [u64; 4],
    failure: Option<String>,
    boundaries: Mutex<Vec<DateTime<Utc>>>,
    queries: AtomicUsize,
}

impl FakeJobBackend {
    pub fn new(busy: u64, queued: u64, retries: u64, scheduled: u64) -> Self {
        Self {
            counts: [busy, queued, retries, scheduled],
            failure: None,
            boundaries: Mutex::new(vec![]),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_owned()),
            ..Self::new(0, 0, 0, 0)
        }
    }

    pub fn boundaries(&self) -> Vec<DateTime<Utc>> {
        self.boundaries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn answer(&self, index: usize) -> job_backend::Result<u64> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        match self.failure.as_ref() {
            Some(message) => Err(job_backend::Error::Unavailable(message.clone())),
            None => Ok(self.counts[index]),
        }
    }
}

#[async_trait]
impl JobBackend for FakeJobBackend {
    async fn busy_count(&self) -> job_backend::Result<u64> {
        self.answer(0)
    }

    async fn queued_count(&self) -> job_backend::Result<u64> {
        self.answer(1)
    }

    async fn retry_count_before(&self, boundary: DateTime<Utc>) -> job_backend::Result<u64> {
        self.boundaries.lock().unwrap().push(boundary);
        self.answer(2)
    }

    async fn scheduled_count_before(&self, boundary: DateTime<Utc>) -> job_backend::Result<u64> {
        self.boundaries.lock().unwrap().push(boundary);
        self.answer(3)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformCall {
    AppInfo(String),
    FleetSize(String, String),
    SetFleetQuantity(String, String, u64),
}

pub struct FakePlatform {
    maintenance: bool,
    fleet_size: Mutex<u64>,
    failure: Option<String>,
    hang_next: AtomicBool,
    calls: Mutex<Vec<PlatformCall>>,
}

impl FakePlatform {
    pub fn new(maintenance: bool, fleet_size: u64) -> Self {
        Self {
            maintenance,
            fleet_size: Mutex::new(fleet_size),
            failure: None,
            hang_next: AtomicBool::new(false),
            calls: Mutex::new(vec![]),
        }
    }

    /// The first `app_info` call never returns.
    pub fn hanging_once(maintenance: bool, fleet_size: u64) -> Self {
        let platform = Self::new(maintenance, fleet_size);
        platform.hang_next.store(true, Ordering::SeqCst);
        platform
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_owned()),
            ..Self::new(false, 0)
        }
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resize_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::SetFleetQuantity(..)))
            .count()
    }

    fn record(&self, call: PlatformCall) -> platform::Result<()> {
        self.calls.lock().unwrap().push(call);

        match self.failure.as_ref() {
            Some(message) => Err(platform::Error::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn app_info(&self, app: &str) -> platform::Result<AppInfo> {
        self.record(PlatformCall::AppInfo(app.into()))?;

        if self.hang_next.swap(false, Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }

        Ok(AppInfo {
            maintenance: self.maintenance,
        })
    }

    async fn fleet_size(&self, app: &str, dyno_type: &str) -> platform::Result<u64> {
        self.record(PlatformCall::FleetSize(app.into(), dyno_type.into()))?;

        Ok(*self.fleet_size.lock().unwrap())
    }

    async fn set_fleet_quantity(
        &self,
        app: &str,
        dyno_type: &str,
        quantity: u64,
    ) -> platform::Result<()> {
        self.record(PlatformCall::SetFleetQuantity(
            app.into(),
            dyno_type.into(),
            quantity,
        ))?;
        *self.fleet_size.lock().unwrap() = quantity;

        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, HashMap<String, String>)>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(String, HashMap<String, String>)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report_message(&self, message: &str, context: HashMap<String, String>) {
        self.reports
            .lock()
            .unwrap()
            .push((message.to_owned(), context));
    }
}

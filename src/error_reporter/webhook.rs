use super::ErrorReporter;
use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::{ClientBuilder, Url};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info_span, warn};
use tracing_futures::Instrument;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts reports as JSON to an http endpoint.
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    url: Url,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    message: &'a str,
    level: &'static str,
    logger: &'static str,
    timestamp: DateTime<Utc>,
    extra: HashMap<String, String>,
}

impl WebhookReporter {
    pub fn new(url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid webhook url {}", url))?;
        let http_client = ClientBuilder::new()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(Self { url, http_client })
    }
}

impl ErrorReporter for WebhookReporter {
    fn report_message(&self, message: &str, context: HashMap<String, String>) {
        let body = match serde_json::to_vec(&report(message, context)) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize error report: {:?}", e);
                return;
            }
        };

        let request = self
            .http_client
            .post(self.url.clone())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body);

        let span = info_span!("WebhookReporter::report_message", url = %self.url);
        tokio::spawn(
            async move {
                match request.send().await {
                    Ok(response) if !response.status().is_success() => {
                        warn!(status = ?response.status(), "Error report was rejected")
                    }
                    Err(e) => warn!("Failed to deliver error report: {:?}", e),
                    _ => (),
                }
            }
            .instrument(span),
        );
    }
}

fn report(message: &str, extra: HashMap<String, String>) -> Report<'_> {
    Report {
        message,
        level: "error",
        logger: env!("CARGO_PKG_NAME"),
        timestamp: Utc::now(),
        extra,
    }
}

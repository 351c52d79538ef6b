mod webhook;

use crate::config;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

pub use webhook::WebhookReporter;

/// Destination for failures that are swallowed at the evaluation boundary.
///
/// Reporting is fire and forget; implementations never fail and never block the caller
/// on delivery.
pub trait ErrorReporter: Send + Sync {
    fn report_message(&self, message: &str, context: HashMap<String, String>);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report_message(&self, message: &str, context: HashMap<String, String>) {
        error!(?context, "{}", message);
    }
}

pub fn build_from_config(
    config: &config::ErrorReporter,
) -> anyhow::Result<Arc<dyn ErrorReporter>> {
    Ok(match config {
        config::ErrorReporter::Log => Arc::new(LogReporter),
        config::ErrorReporter::Webhook { url, timeout } => {
            Arc::new(WebhookReporter::new(url, *timeout)?)
        }
    })
}

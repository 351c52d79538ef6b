use std::sync::Arc;

pub mod actor;
pub mod autoscaler;
pub mod config;
pub mod error;
pub mod error_reporter;
pub mod heroku;
pub mod job_backend;
pub mod load;
pub mod platform;
pub mod reconciler;
pub mod scaling;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testing;

pub type AppConfig = Arc<config::Config>;

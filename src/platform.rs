mod heroku;
mod mock;

use crate::config;
use async_trait::async_trait;
use std::sync::Arc;

pub use self::heroku::HerokuPlatform;
pub use self::mock::MockPlatform;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Heroku(#[from] crate::heroku::error::Error),
    #[error("Platform unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppInfo {
    pub maintenance: bool,
}

/// Provisioning api of the platform hosting the worker fleet.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn app_info(&self, app: &str) -> Result<AppInfo>;

    /// Number of live worker processes of the given type.
    async fn fleet_size(&self, app: &str, dyno_type: &str) -> Result<u64>;

    async fn set_fleet_quantity(&self, app: &str, dyno_type: &str, quantity: u64) -> Result<()>;
}

pub fn build_from_config(config: &config::Platform) -> anyhow::Result<Arc<dyn Platform>> {
    Ok(match config {
        config::Platform::Mock {
            maintenance,
            fleet_size,
            ..
        } => Arc::new(MockPlatform::new(*maintenance, *fleet_size)),
        config::Platform::Heroku {
            address,
            api_token,
            timeout,
            ..
        } => {
            let mut builder = crate::heroku::Client::builder();

            if let Some(address) = address {
                builder = builder.address(address.clone());
            }

            if let Some(api_token) = api_token {
                builder = builder.api_token(api_token.clone());
            }

            if let Some(timeout) = timeout {
                builder = builder.timeout(*timeout);
            }

            Arc::new(HerokuPlatform::new(builder.build()?))
        }
    })
}

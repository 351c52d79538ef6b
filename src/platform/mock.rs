use super::{AppInfo, Platform, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// In-memory fleet for dry runs; resizes only change the recorded size.
#[derive(Debug, Default)]
pub struct MockPlatform {
    maintenance: bool,
    fleet_size: AtomicU64,
}

impl MockPlatform {
    pub fn new(maintenance: bool, fleet_size: u64) -> Self {
        Self {
            maintenance,
            fleet_size: AtomicU64::new(fleet_size),
        }
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn app_info(&self, _app: &str) -> Result<AppInfo> {
        Ok(AppInfo {
            maintenance: self.maintenance,
        })
    }

    async fn fleet_size(&self, _app: &str, _dyno_type: &str) -> Result<u64> {
        Ok(self.fleet_size.load(Ordering::SeqCst))
    }

    async fn set_fleet_quantity(&self, app: &str, dyno_type: &str, quantity: u64) -> Result<()> {
        info!(app, dyno_type, quantity, "Mock fleet resize");
        self.fleet_size.store(quantity, Ordering::SeqCst);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resize_updates_fleet_size() {
        let platform = MockPlatform::new(false, 1);

        platform.set_fleet_quantity("demo", "background", 4).await.unwrap();

        assert_eq!(4, platform.fleet_size("demo", "background").await.unwrap());
        assert!(!platform.app_info("demo").await.unwrap().maintenance);
    }
}

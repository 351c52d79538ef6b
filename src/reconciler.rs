use crate::platform::{self, Platform};
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    SkippedMaintenance,
    Unchanged { size: u64 },
    Resized { from: u64, to: u64 },
}

/// Moves the live fleet towards a target size.
///
/// The fleet state is read fresh on every call, so repeated or overlapping calls
/// converge on the latest target instead of compounding.
pub struct FleetReconciler {
    platform: Arc<dyn Platform>,
    app_name: String,
    dyno_type: String,
}

impl FleetReconciler {
    pub fn new(platform: Arc<dyn Platform>, app_name: String, dyno_type: String) -> Self {
        Self {
            platform,
            app_name,
            dyno_type,
        }
    }

    #[tracing::instrument(
        name = "FleetReconciler::reconcile",
        skip(self),
        fields(app = %self.app_name, dyno_type = %self.dyno_type)
    )]
    pub async fn reconcile(&self, target_workers: u64) -> platform::Result<Reconciliation> {
        if self.platform.app_info(&self.app_name).await?.maintenance {
            info!("Skipping fleet reconciliation due to maintenance");
            return Ok(Reconciliation::SkippedMaintenance);
        }

        let current = self
            .platform
            .fleet_size(&self.app_name, &self.dyno_type)
            .await?;

        if current == target_workers {
            return Ok(Reconciliation::Unchanged { size: current });
        }

        info!(from = current, to = target_workers, "Scale to {} worker(s)", target_workers);
        self.platform
            .set_fleet_quantity(&self.app_name, &self.dyno_type, target_workers)
            .await?;

        Ok(Reconciliation::Resized {
            from: current,
            to: target_workers,
        })
    }
}

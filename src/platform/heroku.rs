use super::{AppInfo, Platform, Result};
use crate::heroku::apps::Apps;
use crate::heroku::dynos::{Dyno, Dynos};
use crate::heroku::formation::{FormationUpdate, Formations};
use crate::heroku::error::Error as HerokuError;
use crate::heroku::Client;
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct HerokuPlatform {
    client: Client,
}

impl HerokuPlatform {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Platform for HerokuPlatform {
    #[tracing::instrument(name = "HerokuPlatform::app_info", skip(self))]
    async fn app_info(&self, app: &str) -> Result<AppInfo> {
        let app = self.client.get_app(app).await.map_err(note_rate_limit)?;

        Ok(AppInfo {
            maintenance: app.maintenance,
        })
    }

    #[tracing::instrument(name = "HerokuPlatform::fleet_size", skip(self))]
    async fn fleet_size(&self, app: &str, dyno_type: &str) -> Result<u64> {
        let dynos = self
            .client
            .get_all_dynos(app)
            .await
            .map_err(note_rate_limit)?;
        let size = count_live_dynos(&dynos, dyno_type);

        debug!(total = dynos.len(), size, "Counted live dynos");

        Ok(size)
    }

    #[tracing::instrument(name = "HerokuPlatform::set_fleet_quantity", skip(self))]
    async fn set_fleet_quantity(&self, app: &str, dyno_type: &str, quantity: u64) -> Result<()> {
        let formation = self
            .client
            .update_formation(app, dyno_type, &FormationUpdate { quantity })
            .await
            .map_err(note_rate_limit)?;

        debug!(quantity = formation.quantity, "Updated formation");

        Ok(())
    }
}

fn note_rate_limit(error: HerokuError) -> HerokuError {
    if error.is_rate_limited() {
        warn!("Heroku api rate limit reached");
    }

    error
}

fn count_live_dynos(dynos: &[Dyno], dyno_type: &str) -> u64 {
    dynos
        .iter()
        .filter(|d| d.process_type == dyno_type && d.state.is_live())
        .count() as u64
}

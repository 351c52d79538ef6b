use super::Result;
use crate::heroku::request::patch;
use crate::heroku::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Formation {
    pub id: String,
    #[serde(rename = "type")]
    pub process_type: String,
    pub quantity: u64,
    pub size: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FormationUpdate {
    pub quantity: u64,
}

#[async_trait]
pub trait Formations {
    async fn update_formation(
        &self,
        app: &str,
        process_type: &str,
        update: &FormationUpdate,
    ) -> Result<Formation>;
}

#[async_trait]
impl Formations for Client {
    async fn update_formation(
        &self,
        app: &str,
        process_type: &str,
        update: &FormationUpdate,
    ) -> Result<Formation> {
        let path = format!("/apps/{}/formation/{}", app, process_type);

        patch(&self.http_client, &self.config, &path, update).await
    }
}

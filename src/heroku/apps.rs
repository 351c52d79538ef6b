use super::Result;
use crate::heroku::request::get;
use crate::heroku::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
    pub maintenance: bool,
}

#[async_trait]
pub trait Apps {
    async fn get_app(&self, app: &str) -> Result<App>;
}

#[async_trait]
impl Apps for Client {
    async fn get_app(&self, app: &str) -> Result<App> {
        let path = format!("/apps/{}", app);

        get(&self.http_client, &self.config, &path).await
    }
}

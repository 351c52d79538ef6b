use super::Result;
use crate::heroku::request::get;
use crate::heroku::Client;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dyno {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub process_type: String,
    #[serde(deserialize_with = "parse_dyno_state")]
    pub state: DynoState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DynoState {
    Crashed,
    Down,
    Idle,
    Starting,
    Up,
    Unknown,
}

impl DynoState {
    /// Dynos that are running or about to run work.
    pub fn is_live(self) -> bool {
        matches!(self, DynoState::Up | DynoState::Starting)
    }
}

#[async_trait]
pub trait Dynos {
    async fn get_all_dynos(&self, app: &str) -> Result<Vec<Dyno>>;
}

#[async_trait]
impl Dynos for Client {
    async fn get_all_dynos(&self, app: &str) -> Result<Vec<Dyno>> {
        let path = format!("/apps/{}/dynos", app);

        get(&self.http_client, &self.config, &path).await
    }
}

/// States the api adds later on must not break the fleet size lookup.
fn parse_dyno_state<'de, D>(deserializer: D) -> std::result::Result<DynoState, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;

    Ok(s.parse().unwrap_or(DynoState::Unknown))
}

use crate::heroku::{error::Error, Config, Result};
use http::header::ACCEPT;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

const ACCEPT_V3: &str = "application/vnd.heroku+json; version=3";

pub(super) async fn get<R: DeserializeOwned>(
    http_client: &reqwest::Client,
    config: &Config,
    path: &str,
) -> Result<R> {
    let url = gen_url(config, path)?;
    let request_builder = http_client
        .get(url)
        .with_auth(config)
        .header(ACCEPT, ACCEPT_V3)
        .timeout(config.timeout);

    let response = request_builder.send().await?;

    parse_response(response).await
}

pub(super) async fn patch<T: Serialize, R: DeserializeOwned>(
    http_client: &reqwest::Client,
    config: &Config,
    path: &str,
    content: &T,
) -> Result<R> {
    let url = gen_url(config, path)?;
    let request_builder = http_client
        .patch(url)
        .with_auth(config)
        .header(ACCEPT, ACCEPT_V3)
        .timeout(config.timeout)
        .json(content);

    let response = request_builder.send().await?;

    parse_response(response).await
}

async fn parse_response<R: DeserializeOwned>(response: Response) -> Result<R> {
    if !response.status().is_success() {
        let status = response.status();
        let headers = response.headers().clone();

        return Err(Error::from_response(status, &headers, response.text().await?));
    }

    let content = response.text().await?;

    parse_content(content)
}

fn parse_content<R: DeserializeOwned>(content: String) -> Result<R> {
    serde_json::from_str(&content).map_err(|e| Error::Deserialization { source: e, content })
}

trait Authenticated {
    fn with_auth(self, config: &Config) -> Self;
}

impl Authenticated for RequestBuilder {
    fn with_auth(self, config: &Config) -> Self {
        self.bearer_auth(&config.api_token)
    }
}

fn gen_url(config: &Config, path: &str) -> Result<Url> {
    let url = format!("{}{}", config.address, path);
    Url::parse(&url).map_err(|e| Error::InvalidUrl {
        source: e,
        url: url.clone(),
    })
}

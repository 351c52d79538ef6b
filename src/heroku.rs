pub mod apps;
pub mod dynos;
pub mod error;
pub mod formation;
mod request;

use reqwest::ClientBuilder;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "https://api.heroku.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub type Result<T> = std::result::Result<T, error::Error>;

#[derive(Debug)]
pub struct Client {
    config: Config,
    http_client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct Config {
    address: String,
    api_token: String,
    timeout: Duration,
}

impl Client {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Builder {
    address: Option<String>,
    api_token: Option<String>,
    timeout: Option<Duration>,
}

impl Builder {
    pub fn address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }

    pub fn api_token(mut self, api_token: String) -> Self {
        self.api_token = Some(api_token);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Client> {
        use error::Error::*;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http_client = ClientBuilder::new()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(timeout)
            .timeout(timeout);

        Ok(Client {
            config: Config {
                address: self
                    .address
                    .unwrap_or_else(|| DEFAULT_ADDRESS.to_owned())
                    .trim_end_matches('/')
                    .to_owned(),
                api_token: self.api_token.ok_or(MissingConfig("api_token"))?,
                timeout,
            },
            http_client: http_client.build()?,
        })
    }
}

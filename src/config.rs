use std::env;
use std::time::Duration;

use log::{debug, warn};

use crate::error::{Error, Result};

pub const API_URL_VAR: &str = "PREPA_API_URL";
pub const API_TIMEOUT_VAR: &str = "PREPA_API_TIMEOUT";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL the `/events` path is appended to.
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        match lookup(API_URL_VAR) {
            Some(url) => config.api_url = url,
            None => debug!("{API_URL_VAR} not set, using default: {DEFAULT_API_URL}"),
        }

        if let Some(raw) = lookup(API_TIMEOUT_VAR) {
            let secs = raw.trim().parse::<u64>().map_err(|err| {
                warn!("Invalid {API_TIMEOUT_VAR} value: {err}");
                Error::Config(format!("`{API_TIMEOUT_VAR}` must be a number of seconds"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_url)
            .map_err(|err| Error::Config(format!("invalid API URL `{}`: {err}", self.api_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API URL `{}` must use http or https",
                self.api_url
            )));
        }

        Ok(())
    }
}

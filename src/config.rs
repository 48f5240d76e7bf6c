use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{DataSourceError, Result};

pub const BIND_ADDRESS_VAR: &str = "DATASOURCE_BIND_ADDRESS";
pub const BASE_URL_VAR: &str = "SAMPLES_BASE_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "SAMPLES_REQUEST_TIMEOUT_MS";
pub const MAX_CONCURRENT_FETCHES_VAR: &str = "MAX_CONCURRENT_FETCHES";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

/// Configuration for the data source service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP API binds to
    pub bind_address: String,

    /// Base URL of the remote sample service
    pub base_url: String,

    /// Timeout applied by the HTTP client to every sample request
    pub request_timeout: Duration,

    /// Upper bound on fetches in flight per batch, unbounded when `None`
    pub max_concurrent_fetches: Option<usize>,

    /// Emit JSON log lines instead of the compact format
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_millis(30_000),
            max_concurrent_fetches: None,
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind_address) = lookup(BIND_ADDRESS_VAR) {
            config.bind_address = bind_address;
        }

        if let Some(base_url) = lookup(BASE_URL_VAR) {
            config.base_url = base_url;
        }

        if let Some(timeout) = lookup(REQUEST_TIMEOUT_VAR) {
            config.request_timeout = Duration::from_millis(parse_var(REQUEST_TIMEOUT_VAR, &timeout)?);
        }

        if let Some(limit) = lookup(MAX_CONCURRENT_FETCHES_VAR) {
            let limit: usize = parse_var(MAX_CONCURRENT_FETCHES_VAR, &limit)?;
            if limit == 0 {
                return Err(DataSourceError::Config(format!(
                    "{} must be at least 1",
                    MAX_CONCURRENT_FETCHES_VAR
                )));
            }
            config.max_concurrent_fetches = Some(limit);
        }

        if let Some(format) = lookup(LOG_FORMAT_VAR) {
            config.json_logs = match format.trim().to_ascii_lowercase().as_str() {
                "json" => true,
                "" | "text" | "compact" => false,
                _ => {
                    return Err(DataSourceError::Config(format!(
                        "Invalid value for {}: {:?} (expected json or text)",
                        LOG_FORMAT_VAR, format
                    )))
                }
            };
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DataSourceError::Config(format!("Invalid value for {}: {:?}", key, value)))
}

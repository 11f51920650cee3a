//! Runtime settings loaded from the environment (and `.env` via dotenv)

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::api::wallet::EmbeddedWalletClient;
use crate::utils::ratelimit::DEFAULT_MAX_REQUESTS_PER_SECOND;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} not set in environment")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Bounded retry used after a local sign or cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: String,
    pub wallet_id: String,
    pub device_id: String,
    pub account_id: String,
    pub poll_interval: Duration,
    pub settle: SettlePolicy,
    pub max_sync_pages: usize,
    pub api_max_requests_per_second: usize,
}

impl Config {
    /// Read every setting from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but over an explicit map
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid { key, value }),
            }
        };
        // zero would spin the poller or stall the limiter
        let positive = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match number(key, default)? {
                0 => Err(ConfigError::Invalid {
                    key,
                    value: "0".to_string(),
                }),
                n => Ok(n),
            }
        };
        let narrow = |key: &'static str, n: u64| -> Result<u32, ConfigError> {
            u32::try_from(n).map_err(|_| ConfigError::Invalid {
                key,
                value: n.to_string(),
            })
        };

        let settle = SettlePolicy {
            attempts: narrow("SETTLE_ATTEMPTS", number("SETTLE_ATTEMPTS", 6)?)?,
            interval: Duration::from_millis(number("SETTLE_INTERVAL_MS", 1000)?),
        };

        Ok(Self {
            api_base_url: lookup("WALLET_API_BASE_URL")
                .unwrap_or_else(|| EmbeddedWalletClient::DEFAULT_BASE_URL.to_string()),
            api_token: required("WALLET_API_TOKEN")?,
            wallet_id: required("WALLET_ID")?,
            device_id: required("DEVICE_ID")?,
            account_id: lookup("ACCOUNT_ID").unwrap_or_else(|| "0".to_string()),
            poll_interval: Duration::from_millis(positive("POLL_INTERVAL_MS", 5000)?),
            settle,
            max_sync_pages: narrow("MAX_SYNC_PAGES", positive("MAX_SYNC_PAGES", 50)?)? as usize,
            api_max_requests_per_second: narrow(
                "API_MAX_REQUESTS_PER_SECOND",
                positive(
                    "API_MAX_REQUESTS_PER_SECOND",
                    DEFAULT_MAX_REQUESTS_PER_SECOND as u64,
                )?,
            )? as usize,
        })
    }
}

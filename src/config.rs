//! Service configuration from environment variables
//!
//! `main` loads `.env` through dotenvy before calling [`AppConfig::from_env`].

use std::env;

use thiserror::Error;

use crate::services::validation::{CurrencyAllowList, DealValidator, TimestampWindow};

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

/// `DATABASE_URL` value selecting the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_addr: String,
    pub currencies: CurrencyAllowList,
    /// `None` when the timestamp window rule is disabled
    pub timestamp_window: Option<TimestampWindow>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; tests pass a closure over a map
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let server_addr =
            lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        let currencies = match lookup("DEAL_CURRENCIES") {
            Some(raw) => {
                let codes: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if codes.is_empty() {
                    return Err(ConfigError::Invalid {
                        name: "DEAL_CURRENCIES",
                        value: raw,
                    });
                }
                CurrencyAllowList::new(codes)
            }
            None => CurrencyAllowList::default(),
        };

        let window_enabled = match lookup("DEAL_TIMESTAMP_WINDOW_ENABLED") {
            Some(raw) => parse_bool("DEAL_TIMESTAMP_WINDOW_ENABLED", &raw)?,
            None => false,
        };

        let timestamp_window = if window_enabled {
            let defaults = TimestampWindow::default();
            Some(TimestampWindow {
                max_age_days: parse_days(
                    "DEAL_TIMESTAMP_MAX_AGE_DAYS",
                    lookup("DEAL_TIMESTAMP_MAX_AGE_DAYS"),
                    defaults.max_age_days,
                )?,
                max_future_days: parse_days(
                    "DEAL_TIMESTAMP_MAX_FUTURE_DAYS",
                    lookup("DEAL_TIMESTAMP_MAX_FUTURE_DAYS"),
                    defaults.max_future_days,
                )?,
            })
        } else {
            None
        };

        Ok(Self {
            database_url,
            server_addr,
            currencies,
            timestamp_window,
        })
    }

    pub fn validator(&self) -> DealValidator {
        let validator = DealValidator::new(self.currencies.clone());
        match self.timestamp_window {
            Some(window) => validator.with_timestamp_window(window),
            None => validator,
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
        }),
    }
}

fn parse_days(name: &'static str, raw: Option<String>, default: i64) -> Result<i64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(days) if days >= 0 => Ok(days),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::external::hyperliquid::HYPERLIQUID_API_URL;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TRACKED_COINS: &[&str] = &["BTC", "ETH", "SOL", "ARB", "AVAX"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: IpAddr,
    pub port: u16,
    pub hyperliquid_api_url: String,
    pub upstream_timeout: Duration,
    pub tracked_coins: Vec<String>,
    pub fetch_interval: Duration,
    pub cleanup_interval: Duration,
    pub retention: chrono::Duration,
    pub query_window: chrono::Duration,
    pub http_shutdown_timeout: Duration,
    pub worker_shutdown_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let tracked_coins = match var("TRACKED_COINS") {
            Some(raw) => parse_coins(&raw)?,
            None => DEFAULT_TRACKED_COINS.iter().map(|c| c.to_string()).collect(),
        };

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", var("DB_MAX_CONNECTIONS"), 10)?,
            bind_addr: parse_or("BIND_ADDR", var("BIND_ADDR"), IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            hyperliquid_api_url: var("HYPERLIQUID_API_URL")
                .unwrap_or_else(|| HYPERLIQUID_API_URL.to_string()),
            upstream_timeout: secs("UPSTREAM_TIMEOUT_SECS", var("UPSTREAM_TIMEOUT_SECS"), 30)?,
            tracked_coins,
            fetch_interval: secs("FETCH_INTERVAL_SECS", var("FETCH_INTERVAL_SECS"), 3600)?,
            cleanup_interval: secs("CLEANUP_INTERVAL_SECS", var("CLEANUP_INTERVAL_SECS"), 3600)?,
            retention: hours("RETENTION_HOURS", var("RETENTION_HOURS"), 48)?,
            query_window: hours("QUERY_WINDOW_HOURS", var("QUERY_WINDOW_HOURS"), 24)?,
            http_shutdown_timeout: secs(
                "HTTP_SHUTDOWN_TIMEOUT_SECS",
                var("HTTP_SHUTDOWN_TIMEOUT_SECS"),
                10,
            )?,
            worker_shutdown_timeout: secs(
                "WORKER_SHUTDOWN_TIMEOUT_SECS",
                var("WORKER_SHUTDOWN_TIMEOUT_SECS"),
                30,
            )?,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn secs(name: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let value = parse_or(name, raw.clone(), default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: raw.unwrap_or_default(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(value))
}

fn hours(name: &'static str, raw: Option<String>, default: i64) -> Result<chrono::Duration, ConfigError> {
    let value = parse_or(name, raw.clone(), default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            value: raw.unwrap_or_default(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(chrono::Duration::hours(value))
}

fn parse_coins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let coins: Vec<String> = raw
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if coins.is_empty() {
        return Err(ConfigError::Invalid {
            name: "TRACKED_COINS",
            value: raw.to_string(),
            reason: "no coins listed".to_string(),
        });
    }
    Ok(coins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/dexlite")]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.hyperliquid_api_url, HYPERLIQUID_API_URL);
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.tracked_coins, vec!["BTC", "ETH", "SOL", "ARB", "AVAX"]);
        assert_eq!(config.fetch_interval, Duration::from_secs(3600));
        assert_eq!(config.cleanup_interval, Duration::from_secs(3600));
        assert_eq!(config.retention, chrono::Duration::days(2));
        assert_eq!(config.query_window, chrono::Duration::hours(24));
        assert_eq!(config.http_shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.worker_shutdown_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_database_url() {
        let err = config_from(&[("PORT", "9000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_empty_port_uses_default() {
        let config = config_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = config_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = config_from(&[("DATABASE_URL", "postgres://x"), ("FETCH_INTERVAL_SECS", "0")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FETCH_INTERVAL_SECS", .. }));
    }

    #[test]
    fn test_tracked_coins_are_trimmed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("TRACKED_COINS", " BTC, ETH ,,kPEPE "),
        ])
        .unwrap();
        assert_eq!(config.tracked_coins, vec!["BTC", "ETH", "kPEPE"]);
    }
}

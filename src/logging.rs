//! Process-wide tracing setup.
//!
//! Always installs an `EnvFilter` and a stdout fmt layer. With the `loki`
//! feature compiled in and `LOKI_ENABLED=true`, log lines are also shipped
//! to Loki, labelled with the service name and environment.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,tower_http=debug,sqlx=warn";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Self {
            loki_enabled: lookup("LOKI_ENABLED")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            loki_url: lookup("LOKI_URL").filter(|v| !v.trim().is_empty()),
            service_name: var_or("SERVICE_NAME", "dexlite"),
            environment: var_or("ENVIRONMENT", "development"),
            log_level: var_or("RUST_LOG", DEFAULT_FILTER),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.loki_enabled && self.loki_url.is_none() {
            anyhow::bail!("LOKI_ENABLED is true but LOKI_URL is not set");
        }
        Ok(())
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    config.validate()?;

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer());

    #[cfg(feature = "loki")]
    let subscriber = subscriber.with(loki_layer(&config)?);

    subscriber.try_init()?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        loki = config.loki_enabled,
        "📊 Logging initialized"
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig) -> anyhow::Result<Option<tracing_loki::Layer>> {
    let Some(loki_url) = config.loki_url.as_deref().filter(|_| config.loki_enabled) else {
        return Ok(None);
    };

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url::Url::parse(loki_url)?)?;

    tokio::spawn(task);
    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> LoggingConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert!(!config.loki_enabled);
        assert_eq!(config.service_name, "dexlite");
        assert_eq!(config.log_level, DEFAULT_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loki_requires_url() {
        assert!(config_from(&[("LOKI_ENABLED", "true")]).validate().is_err());
        assert!(config_from(&[("LOKI_ENABLED", "true"), ("LOKI_URL", " ")]).validate().is_err());

        let config = config_from(&[("LOKI_ENABLED", "true"), ("LOKI_URL", "http://localhost:3100")]);
        assert!(config.validate().is_ok());
    }
}

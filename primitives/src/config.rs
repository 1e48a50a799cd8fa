use std::fs;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DEVELOPMENT_CONFIG: Lazy<Config> =
    Lazy::new(|| toml::from_str(include_str!("../../docs/config/dev.toml")).expect("valid dev.toml"));
static PRODUCTION_CONFIG: Lazy<Config> = Lazy::new(|| {
    toml::from_str(include_str!("../../docs/config/prod.toml")).expect("valid prod.toml")
});

/// Process-wide tunables (spec.md §6). All durations are milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub identity: Option<String>,
    /// Warning threshold; ticking more channels than this logs a warning
    /// but is not itself an error.
    pub max_channels: u32,
    /// Milliseconds between tick cycles.
    pub wait_time: u32,
    /// Milliseconds a single channel's tick may run before being abandoned.
    pub validator_tick_timeout: u32,
    /// Milliseconds the sentry `channel/list` request may take.
    pub list_timeout: u32,
    /// Milliseconds any other sentry HTTP request may take.
    pub fetch_timeout: u32,
    /// Milliseconds allowed for `propagate` to a single peer.
    pub propagation_timeout: u32,
    /// Milliseconds of Heartbeat staleness before a new one is emitted.
    pub heartbeat_time: u32,
    /// Integer 0-1000; `isHealthy`'s promille threshold.
    pub health_threshold_promilles: u32,
    pub channels_find_limit: u32,
    pub events_find_limit: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Invalid(#[from] toml::de::Error),
}

/// Loads `config_file` if given, otherwise the built-in dev/production
/// defaults selected by `environment` (`"production"` vs. anything else).
pub fn configuration(environment: &str, config_file: Option<&str>) -> Result<Config, ConfigError> {
    match config_file {
        Some(path) => {
            let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;

            Ok(toml::from_str(&contents)?)
        }
        None => match environment {
            "production" => Ok(PRODUCTION_CONFIG.clone()),
            _ => Ok(DEVELOPMENT_CONFIG.clone()),
        },
    }
}

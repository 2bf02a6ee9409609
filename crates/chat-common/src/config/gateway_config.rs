//! Gateway client configuration
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Gateway client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Bot token used for Identify and Resume
    pub token: String,
    /// Gateway URL used for fresh connections
    #[serde(default = "default_url")]
    pub url: String,
    /// Raw intents bitfield
    #[serde(default)]
    pub intents: u64,
    /// Member count above which a guild is considered large
    #[serde(default = "default_large_threshold")]
    pub large_threshold: u32,
    /// Total number of shards for this application
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,
    /// Subset of shard ids to run (all shards when empty)
    #[serde(default)]
    pub shard_ids: Vec<u32>,
    /// Replaces the heartbeat interval announced in Hello (testing only)
    #[serde(default)]
    pub heartbeat_interval_override_ms: Option<u64>,
    /// Reconnect backoff policy
    #[serde(default)]
    pub backoff: BackoffConfig,
    /// Minimum spacing between identify attempts
    #[serde(default = "default_identify_spacing_ms")]
    pub identify_spacing_ms: u64,
    /// Identifies allowed per spacing window
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
    /// Consecutive protocol errors tolerated before reconnecting
    #[serde(default = "default_max_protocol_errors")]
    pub max_protocol_errors: u32,
    /// Upper bound for shard manager shutdown
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Close codes that end a shard for good
    #[serde(default = "default_fatal_close_codes")]
    pub fatal_close_codes: Vec<u16>,
    /// Close codes that invalidate the session but allow a fresh identify
    #[serde(default = "default_reidentify_close_codes")]
    pub reidentify_close_codes: Vec<u16>,
}

/// Exponential backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_backoff_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
    /// Fraction of the delay randomized in both directions (0.0 - 1.0)
    #[serde(default = "default_backoff_jitter")]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_backoff_base_ms(),
            max_ms: default_backoff_max_ms(),
            jitter: default_backoff_jitter(),
        }
    }
}

// Default value functions
fn default_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_large_threshold() -> u32 {
    50
}

fn default_shard_count() -> u32 {
    1
}

fn default_identify_spacing_ms() -> u64 {
    5_000
}

fn default_max_concurrency() -> u32 {
    1
}

fn default_max_protocol_errors() -> u32 {
    5
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

fn default_fatal_close_codes() -> Vec<u16> {
    vec![4004, 4010, 4011, 4012, 4013, 4014]
}

fn default_reidentify_close_codes() -> Vec<u16> {
    vec![4007, 4009]
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_backoff_jitter() -> f64 {
    0.25
}

impl GatewayConfig {
    /// Create a configuration with defaults for everything but the token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: default_url(),
            intents: 0,
            large_threshold: default_large_threshold(),
            shard_count: default_shard_count(),
            shard_ids: Vec::new(),
            heartbeat_interval_override_ms: None,
            backoff: BackoffConfig::default(),
            identify_spacing_ms: default_identify_spacing_ms(),
            max_concurrency: default_max_concurrency(),
            max_protocol_errors: default_max_protocol_errors(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            fatal_close_codes: default_fatal_close_codes(),
            reidentify_close_codes: default_reidentify_close_codes(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("GATEWAY_TOKEN").ok_or(ConfigError::MissingVar("GATEWAY_TOKEN"))?;
        let mut config = Self::new(token);

        if let Some(url) = lookup("GATEWAY_URL") {
            config.url = url;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_INTENTS")? {
            config.intents = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_LARGE_THRESHOLD")? {
            config.large_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_SHARD_COUNT")? {
            config.shard_count = v;
        }
        if let Some(v) = parse_list(&lookup, "GATEWAY_SHARD_IDS")? {
            config.shard_ids = v;
        }
        config.heartbeat_interval_override_ms =
            parse_var(&lookup, "GATEWAY_HEARTBEAT_INTERVAL_MS")?;
        if let Some(v) = parse_var(&lookup, "GATEWAY_BACKOFF_BASE_MS")? {
            config.backoff.base_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_BACKOFF_MAX_MS")? {
            config.backoff.max_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_BACKOFF_JITTER")? {
            config.backoff.jitter = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_IDENTIFY_SPACING_MS")? {
            config.identify_spacing_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_MAX_CONCURRENCY")? {
            config.max_concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_MAX_PROTOCOL_ERRORS")? {
            config.max_protocol_errors = v;
        }
        if let Some(v) = parse_var(&lookup, "GATEWAY_SHUTDOWN_TIMEOUT_MS")? {
            config.shutdown_timeout_ms = v;
        }
        if let Some(v) = parse_list(&lookup, "GATEWAY_FATAL_CLOSE_CODES")? {
            config.fatal_close_codes = v;
        }
        if let Some(v) = parse_list(&lookup, "GATEWAY_REIDENTIFY_CLOSE_CODES")? {
            config.reidentify_close_codes = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_SHARD_COUNT",
                "must be at least 1".to_string(),
            ));
        }
        if let Some(id) = self.shard_ids.iter().find(|id| **id >= self.shard_count) {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_SHARD_IDS",
                format!("shard {id} is out of range for {} shards", self.shard_count),
            ));
        }
        if self.backoff.base_ms > self.backoff.max_ms {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_BACKOFF_BASE_MS",
                "must not exceed GATEWAY_BACKOFF_MAX_MS".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter) {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_BACKOFF_JITTER",
                "must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_MAX_CONCURRENCY",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Shard ids this process should run
    #[must_use]
    pub fn effective_shard_ids(&self) -> Vec<u32> {
        if self.shard_ids.is_empty() {
            (0..self.shard_count).collect()
        } else {
            let mut ids = self.shard_ids.clone();
            ids.sort_unstable();
            ids.dedup();
            ids
        }
    }

    #[must_use]
    pub fn heartbeat_interval_override(&self) -> Option<Duration> {
        self.heartbeat_interval_override_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn identify_spacing(&self) -> Duration {
        Duration::from_millis(self.identify_spacing_ms)
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
    }
}

fn parse_list<T, F>(lookup: &F, key: &'static str) -> Result<Option<Vec<T>>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(|_| ConfigError::InvalidValue(key, raw.clone())))
            .collect::<Result<Vec<T>, _>>()
            .map(Some),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

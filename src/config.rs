//! Configuration management for Stellar.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StellarError};
use crate::ratelimit::RateLimiterSettings;

/// Prefix for environment overrides, e.g. `STELLAR_RATE_LIMITING__MAX_REQUESTS=3`.
const ENV_PREFIX: &str = "STELLAR";

/// Main configuration for Stellar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StellarConfig {
    /// Download rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Download rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Downloads counted per client and theme in each window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Maximum number of client/theme keys tracked at once
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,

    /// Chance that a check also sweeps expired keys
    #[serde(default = "default_cleanup_probability")]
    pub cleanup_probability: f64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            max_tracked_keys: default_max_tracked_keys(),
            cleanup_probability: default_cleanup_probability(),
        }
    }
}

fn default_window_secs() -> u64 {
    30 * 60
}

fn default_max_requests() -> u32 {
    1
}

fn default_max_tracked_keys() -> usize {
    10000
}

fn default_cleanup_probability() -> f64 {
    0.01
}

impl RateLimitingConfig {
    /// Check the values and turn them into limiter settings.
    pub fn settings(&self) -> Result<RateLimiterSettings> {
        if self.window_secs == 0 {
            return Err(StellarError::Config("rate_limiting.window_secs must be positive".into()));
        }
        if self.max_requests == 0 {
            return Err(StellarError::Config("rate_limiting.max_requests must be positive".into()));
        }
        if self.max_tracked_keys == 0 {
            return Err(StellarError::Config(
                "rate_limiting.max_tracked_keys must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cleanup_probability) {
            return Err(StellarError::Config(format!(
                "rate_limiting.cleanup_probability must be within 0..=1, got {}",
                self.cleanup_probability
            )));
        }

        Ok(RateLimiterSettings {
            window: Duration::from_secs(self.window_secs),
            max_requests: self.max_requests,
            max_tracked_keys: self.max_tracked_keys,
            cleanup_probability: self.cleanup_probability,
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl StellarConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| StellarError::Config(e.to_string()))
    }

    /// Load configuration from an optional YAML file, then apply
    /// `STELLAR_*` environment overrides (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::new(
                &path.to_string_lossy(),
                config::FileFormat::Yaml,
            ));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StellarError::Config(e.to_string()))
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| StellarError::Config(e.to_string()))
    }
}

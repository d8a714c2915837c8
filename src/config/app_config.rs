use std::time::Duration;

use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::{Deserialize, Serialize};

use crate::domain::rate_limit::RateLimiterConfig;
use crate::domain::resonance::ScoringWeights;
use crate::domain::retry::{RetryConfig, RetryPreset};
use crate::domain::similarity_cache::SimilarityCacheConfig;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::services::DEFAULT_ACTION;

/// Environment variable prefix, e.g. `MATCHER__CACHE__TTL_SECS=600`
pub const ENV_PREFIX: &str = "MATCHER";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: SimilarityCacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimiterConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Retry preset plus optional per-field overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default)]
    pub preset: RetryPreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RetrySettings {
    /// The preset's configuration with overrides applied
    pub fn resolve(&self) -> RetryConfig {
        let mut config = self.preset.config();

        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(ms) = self.initial_delay_ms {
            config = config.with_initial_delay(ms);
        }
        if let Some(ms) = self.max_delay_ms {
            config = config.with_max_delay(ms);
        }
        if let Some(factor) = self.backoff_factor {
            config = config.with_backoff_factor(factor);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(ms);
        }

        config
    }
}

/// Upstream candidate source
///
/// With no `base_url` the CLI falls back to a fixture catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_source_limit")]
    pub limit: u32,
    /// Transport timeout for a single HTTP request
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    /// Fixture catalog used when no `base_url` is set
    #[serde(default)]
    pub fixtures: Option<String>,
}

fn default_source_limit() -> u32 {
    50
}

fn default_source_timeout_ms() -> u64 {
    10_000
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Rate-limit action for match requests
    #[serde(default = "default_action")]
    pub action: String,
}

fn default_action() -> String {
    DEFAULT_ACTION.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            limit: default_source_limit(),
            timeout_ms: default_source_timeout_ms(),
            fixtures: None,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            action: default_action(),
        }
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local`, an optional extra file and
    /// `MATCHER__*` variables
    pub fn load_from(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file));
        }

        Self::from_builder(builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        ))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}

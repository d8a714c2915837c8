//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, LogFormat, LoggingConfig, MatchingConfig, RetrySettings, SourceConfig, ENV_PREFIX,
};

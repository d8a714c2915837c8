//! Classified retry with exponential backoff

mod classify;
mod config;
mod executor;

pub use classify::{classify, ErrorClass};
pub use config::{RetryConfig, RetryPreset};
pub use executor::{RetryError, RetryExecutor};

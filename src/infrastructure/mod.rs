//! Infrastructure layer - Stores, sources and process setup

pub mod logging;
pub mod observability;
pub mod rate_limit;
pub mod services;
pub mod similarity_cache;
pub mod source;

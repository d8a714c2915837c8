//! Application services

mod matching_orchestrator;

pub use matching_orchestrator::{MatchingOrchestrator, DEFAULT_ACTION};

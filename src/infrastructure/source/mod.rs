//! Candidate source implementations

mod http;
mod in_memory;

pub use http::HttpCandidateSource;
pub use in_memory::InMemoryCandidateSource;

//! Pattern key generation
//!
//! Keys are derived from the categorical fields only. Price bounds are left
//! out so nearby ranges share a slot and the cache decides by similarity.

use std::fmt;

use sha2::{Digest, Sha256};

use super::DemandPattern;

/// Stable cache key for a demand pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternKey(String);

impl PatternKey {
    pub const NAMESPACE: &'static str = "demand";

    pub fn from_pattern(pattern: &DemandPattern) -> Self {
        let canonical = format!(
            "category={}|term={}",
            canonicalize(pattern.category()),
            canonicalize(pattern.search_term())
        );
        let digest = Sha256::digest(canonical.as_bytes());

        Self(format!("{}:{}", Self::NAMESPACE, hex::encode(&digest[..16])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, trim and collapse inner whitespace
pub fn canonicalize(input: &str) -> String {
    input
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

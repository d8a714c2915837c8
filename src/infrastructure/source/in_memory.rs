//! In-memory candidate source backed by a fixture catalog

use std::path::Path;

use async_trait::async_trait;

use super::http::decode_products;
use crate::domain::demand::{canonicalize, Candidate, DemandPattern};
use crate::domain::matching::CandidateSource;
use crate::domain::DomainError;

/// Serves candidates from a fixed catalog
///
/// A candidate matches when its category equals the pattern category
/// (ignoring case), its price lies in the pattern's range, and its title
/// contains at least one search term token. Empty pattern fields match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandidateSource {
    catalog: Vec<Candidate>,
}

impl InMemoryCandidateSource {
    pub fn new(catalog: Vec<Candidate>) -> Self {
        Self { catalog }
    }

    /// Load a catalog from a JSON file (`{"products": [...]}` or an array)
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            DomainError::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(Self::new(decode_products(&bytes)?))
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    fn matches(candidate: &Candidate, pattern: &DemandPattern, tokens: &[String]) -> bool {
        let category = canonicalize(pattern.category());
        if !category.is_empty() && canonicalize(&candidate.category) != category {
            return false;
        }

        if !pattern.price_range().contains(candidate.price) {
            return false;
        }

        let title = canonicalize(&candidate.title);
        tokens.is_empty() || tokens.iter().any(|token| title.contains(token.as_str()))
    }
}

#[async_trait]
impl CandidateSource for InMemoryCandidateSource {
    async fn fetch_candidates(
        &self,
        pattern: &DemandPattern,
    ) -> Result<Vec<Candidate>, DomainError> {
        let tokens: Vec<String> = canonicalize(pattern.search_term())
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        Ok(self
            .catalog
            .iter()
            .filter(|candidate| Self::matches(candidate, pattern, &tokens))
            .cloned()
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "fixtures"
    }
}

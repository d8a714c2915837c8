//! Candidate source trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::demand::{Candidate, DemandPattern};
use crate::domain::DomainError;

/// External supply of candidates for a demand pattern
///
/// Implementations report failures as classified [`DomainError`]s so the
/// retry executor can tell transient from permanent problems.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidates(
        &self,
        pattern: &DemandPattern,
    ) -> Result<Vec<Candidate>, DomainError>;

    /// Short name used as the default rate-limit identifier
    fn source_name(&self) -> &'static str;
}

//! Matching request types and the candidate source seam

mod outcome;
mod source;

pub use outcome::{MatchError, MatchOptions, MatchOutcome, MatchStage};
pub use source::CandidateSource;

#[cfg(test)]
pub use source::MockCandidateSource;

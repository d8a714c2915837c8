//! Demand patterns, supply candidates and pattern keys

mod candidate;
mod key;
mod pattern;

pub use candidate::Candidate;
pub use key::{canonicalize, PatternKey};
pub use pattern::{ContextSignal, DemandPattern, PriceRange};

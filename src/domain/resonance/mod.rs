//! Resonance scoring domain
//!
//! Compares supply and demand through (dimension, magnitude, direction)
//! vectors and derives coherence, intensity and confidence in `[0, 1]`.

mod extractor;
mod scorer;
mod vector;

pub use extractor::{DIMENSION_CATEGORY, DIMENSION_PRICE, DIMENSION_TERM, VectorExtractor};
pub use scorer::{rank, ResonanceScorer, ScoringWeights, MAX_INTENSITY};
pub use vector::{ResonanceScore, ResonanceState, ResonanceVector, ScoredCandidate};

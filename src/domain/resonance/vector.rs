//! Resonance vectors and aggregate state

use serde::{Deserialize, Serialize};

use crate::domain::demand::Candidate;

/// A (dimension, magnitude, direction) triple for one side of a match
///
/// Values are stored as produced; [`ResonanceVector::magnitude`] and
/// [`ResonanceVector::direction`] return them clamped to their ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceVector {
    pub dimension: String,
    magnitude: f32,
    direction: f32,
}

impl ResonanceVector {
    pub fn new(dimension: impl Into<String>, magnitude: f32, direction: f32) -> Self {
        Self {
            dimension: dimension.into(),
            magnitude,
            direction,
        }
    }

    /// Magnitude in `[0, 1]`; non-finite values read as 0
    pub fn magnitude(&self) -> f32 {
        sanitize(self.magnitude).clamp(0.0, 1.0)
    }

    /// Direction in `[-1, 1]`; non-finite values read as 0
    pub fn direction(&self) -> f32 {
        sanitize(self.direction).clamp(-1.0, 1.0)
    }

    pub fn raw_magnitude(&self) -> f32 {
        self.magnitude
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Result of scoring one supply side against one demand side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResonanceState {
    pub supply: Vec<ResonanceVector>,
    pub demand: Vec<ResonanceVector>,
    pub coherence: f32,
    pub intensity: f32,
    pub confidence: f32,
}

impl ResonanceState {
    pub fn score(&self) -> ResonanceScore {
        ResonanceScore {
            coherence: self.coherence,
            intensity: self.intensity,
            confidence: self.confidence,
        }
    }
}

/// The three derived scores, without the vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ResonanceScore {
    pub coherence: f32,
    pub intensity: f32,
    pub confidence: f32,
}

/// A candidate with its resonance score, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub coherence: f32,
    pub intensity: f32,
    pub confidence: f32,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, score: ResonanceScore) -> Self {
        Self {
            candidate,
            coherence: score.coherence,
            intensity: score.intensity,
            confidence: score.confidence,
        }
    }

    pub fn score(&self) -> ResonanceScore {
        ResonanceScore {
            coherence: self.coherence,
            intensity: self.intensity,
            confidence: self.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_clamps_out_of_range_values() {
        let vector = ResonanceVector::new("price", 3.5, -7.0);

        assert_eq!(vector.magnitude(), 1.0);
        assert_eq!(vector.direction(), -1.0);
        assert_eq!(vector.raw_magnitude(), 3.5);
    }

    #[test]
    fn test_vector_non_finite_reads_as_zero() {
        let vector = ResonanceVector::new("price", f32::NAN, f32::INFINITY);

        assert_eq!(vector.magnitude(), 0.0);
        assert_eq!(vector.direction(), 0.0);
    }

    #[test]
    fn test_scored_candidate_serializes_flat() {
        let scored = ScoredCandidate::new(
            Candidate::new("a", "Laptop", "electronics", 900.0),
            ResonanceScore {
                coherence: 0.8,
                intensity: 0.5,
                confidence: 0.65,
            },
        );

        let value = serde_json::to_value(&scored).unwrap();

        assert_eq!(value["id"], "a");
        assert_eq!(value["title"], "Laptop");
        assert!(value["confidence"].as_f64().unwrap() > 0.6);
    }
}

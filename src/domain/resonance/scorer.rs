//! Resonance scoring
//!
//! Scores a candidate against a demand pattern from normalized vectors.
//! Scoring never fails: malformed input yields a degraded score instead.

use serde::{Deserialize, Serialize};

use super::{ResonanceState, ResonanceVector, ScoredCandidate, VectorExtractor};
use crate::domain::demand::{Candidate, DemandPattern};

/// Upper bound for intensity
pub const MAX_INTENSITY: f32 = 0.99;

/// Weights blending coherence and intensity into confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_weight")]
    pub coherence_weight: f32,
    #[serde(default = "default_weight")]
    pub intensity_weight: f32,
}

fn default_weight() -> f32 {
    0.5
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            coherence_weight: default_weight(),
            intensity_weight: default_weight(),
        }
    }
}

impl ScoringWeights {
    /// Create weights; negative or non-finite weights are treated as 0
    pub fn new(coherence_weight: f32, intensity_weight: f32) -> Self {
        Self {
            coherence_weight,
            intensity_weight,
        }
    }

    fn coherence(&self) -> f32 {
        non_negative(self.coherence_weight)
    }

    fn intensity(&self) -> f32 {
        non_negative(self.intensity_weight)
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Computes coherence, intensity and confidence between supply and demand
#[derive(Debug, Clone, Default)]
pub struct ResonanceScorer {
    weights: ScoringWeights,
    extractor: VectorExtractor,
}

impl ResonanceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            extractor: VectorExtractor::new(),
        }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Score two vector sets
    pub fn score(&self, supply: &[ResonanceVector], demand: &[ResonanceVector]) -> ResonanceState {
        let coherence = coherence(supply, demand);
        let intensity = intensity(supply, demand);
        let confidence = (self.weights.coherence() * coherence
            + self.weights.intensity() * intensity)
            .clamp(0.0, 1.0);

        ResonanceState {
            supply: supply.to_vec(),
            demand: demand.to_vec(),
            coherence,
            intensity,
            confidence,
        }
    }

    /// Score a single candidate against a pattern
    pub fn score_candidate(&self, candidate: Candidate, pattern: &DemandPattern) -> ScoredCandidate {
        let supply = self.extractor.supply_vectors(&candidate, pattern);
        let demand = self.extractor.demand_vectors(pattern);
        let state = self.score(&supply, &demand);

        ScoredCandidate::new(candidate, state.score())
    }

    /// Score every candidate and return them ranked
    pub fn score_all(
        &self,
        candidates: Vec<Candidate>,
        pattern: &DemandPattern,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| self.score_candidate(candidate, pattern))
            .collect();

        rank(&mut scored);
        scored
    }
}

/// Order by descending confidence, then descending intensity
///
/// The sort is stable, so ties keep the source order.
pub fn rank(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.intensity.total_cmp(&a.intensity))
    });
}

fn coherence(supply: &[ResonanceVector], demand: &[ResonanceVector]) -> f32 {
    let mut total = 0.0f32;
    let mut pairs = 0usize;

    for s in supply {
        for d in demand.iter().filter(|d| d.dimension == s.dimension) {
            total += (1.0 - (s.direction() - d.direction()).abs()).clamp(0.0, 1.0);
            pairs += 1;
        }
    }

    if pairs == 0 {
        return 0.0;
    }

    (total / pairs as f32).clamp(0.0, 1.0)
}

fn intensity(supply: &[ResonanceVector], demand: &[ResonanceVector]) -> f32 {
    if supply.is_empty() || demand.is_empty() {
        return 0.0;
    }

    (mean_magnitude(supply) * mean_magnitude(demand)).clamp(0.0, MAX_INTENSITY)
}

fn mean_magnitude(vectors: &[ResonanceVector]) -> f32 {
    vectors.iter().map(ResonanceVector::magnitude).sum::<f32>() / vectors.len() as f32
}

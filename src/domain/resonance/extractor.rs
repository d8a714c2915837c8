//! Derives supply and demand vectors from candidates and patterns

use std::collections::HashSet;

use super::ResonanceVector;
use crate::domain::demand::{Candidate, DemandPattern, PriceRange};

pub const DIMENSION_CATEGORY: &str = "category";
pub const DIMENSION_TERM: &str = "term";
pub const DIMENSION_PRICE: &str = "price";

/// Builds the vectors compared by the scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorExtractor;

impl VectorExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Vectors describing what the caller asks for
    pub fn demand_vectors(&self, pattern: &DemandPattern) -> Vec<ResonanceVector> {
        let mut vectors = Vec::with_capacity(3 + pattern.context_signals().len());

        if !pattern.category().trim().is_empty() {
            vectors.push(ResonanceVector::new(DIMENSION_CATEGORY, 1.0, 1.0));
        }

        if !tokenize(pattern.search_term()).is_empty() {
            vectors.push(ResonanceVector::new(DIMENSION_TERM, 1.0, 1.0));
        }

        let price_magnitude = if pattern.price_range().is_valid() { 1.0 } else { 0.5 };
        vectors.push(ResonanceVector::new(DIMENSION_PRICE, price_magnitude, 0.0));

        for signal in pattern.context_signals() {
            vectors.push(ResonanceVector::new(
                signal.signal_type.clone(),
                signal.strength,
                1.0,
            ));
        }

        vectors
    }

    /// Vectors describing how a candidate lines up with the pattern
    pub fn supply_vectors(
        &self,
        candidate: &Candidate,
        pattern: &DemandPattern,
    ) -> Vec<ResonanceVector> {
        let mut vectors = Vec::with_capacity(3 + pattern.context_signals().len());

        if !pattern.category().trim().is_empty() {
            let same = candidate
                .category
                .trim()
                .eq_ignore_ascii_case(pattern.category().trim());
            vectors.push(ResonanceVector::new(
                DIMENSION_CATEGORY,
                1.0,
                if same { 1.0 } else { -1.0 },
            ));
        }

        let wanted = tokenize(pattern.search_term());
        if !wanted.is_empty() {
            let offered = tokenize(&candidate.title);
            let found = wanted.iter().filter(|token| offered.contains(*token)).count();
            let overlap = found as f32 / wanted.len() as f32;
            vectors.push(ResonanceVector::new(
                DIMENSION_TERM,
                overlap,
                2.0 * overlap - 1.0,
            ));
        }

        let (magnitude, direction) = price_alignment(candidate.price, pattern.price_range());
        vectors.push(ResonanceVector::new(DIMENSION_PRICE, magnitude, direction));

        for signal in pattern.context_signals() {
            if let Some(value) = candidate.signals.get(&signal.signal_type) {
                vectors.push(ResonanceVector::new(
                    signal.signal_type.clone(),
                    *value,
                    2.0 * *value - 1.0,
                ));
            }
        }

        vectors
    }
}

/// Magnitude and signed offset of a price relative to a range
///
/// Direction is the offset from the range centre in half-widths; magnitude
/// is 1 inside the range and decays with distance outside it.
fn price_alignment(price: f64, range: PriceRange) -> (f32, f32) {
    if !price.is_finite() {
        return (0.0, 0.0);
    }

    let (low, high) = range.ordered();
    let centre = low + (high - low) / 2.0;
    let half_width = (high - low) / 2.0;

    let direction = if half_width > f64::EPSILON {
        (price - centre) / half_width
    } else {
        (price - centre) / centre.abs().max(1.0)
    };

    let distance = if price < low {
        low - price
    } else if price > high {
        price - high
    } else {
        0.0
    };
    let width = (high - low).max(1.0);
    let magnitude = 1.0 / (1.0 + distance / width);

    (magnitude as f32, direction.clamp(-1.0, 1.0) as f32)
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> DemandPattern {
        DemandPattern::new("gaming laptop", "electronics", PriceRange::new(500.0, 1500.0))
            .with_signal("seasonal", 0.8)
    }

    fn find<'a>(vectors: &'a [ResonanceVector], dimension: &str) -> &'a ResonanceVector {
        vectors
            .iter()
            .find(|v| v.dimension == dimension)
            .expect("dimension present")
    }

    #[test]
    fn test_demand_vectors() {
        let vectors = VectorExtractor::new().demand_vectors(&pattern());

        assert_eq!(vectors.len(), 4);
        assert_eq!(find(&vectors, DIMENSION_PRICE).direction(), 0.0);
        assert_eq!(find(&vectors, "seasonal").magnitude(), 0.8);
    }

    #[test]
    fn test_supply_category_mismatch_points_away() {
        let candidate = Candidate::new("1", "Gaming Laptop", "furniture", 1000.0);
        let vectors = VectorExtractor::new().supply_vectors(&candidate, &pattern());

        assert_eq!(find(&vectors, DIMENSION_CATEGORY).direction(), -1.0);
    }

    #[test]
    fn test_supply_term_overlap() {
        let candidate = Candidate::new("1", "Laptop Sleeve", "Electronics", 1000.0);
        let vectors = VectorExtractor::new().supply_vectors(&candidate, &pattern());

        let term = find(&vectors, DIMENSION_TERM);
        assert!((term.magnitude() - 0.5).abs() < 1e-6);
        assert!(term.direction().abs() < 1e-6);
        assert_eq!(find(&vectors, DIMENSION_CATEGORY).direction(), 1.0);
    }

    #[test]
    fn test_price_alignment_centre_and_outside() {
        let range = PriceRange::new(500.0, 1500.0);

        let (magnitude, direction) = price_alignment(1000.0, range);
        assert_eq!(magnitude, 1.0);
        assert_eq!(direction, 0.0);

        let (magnitude, direction) = price_alignment(2500.0, range);
        assert!((magnitude - 0.5).abs() < 1e-6);
        assert_eq!(direction, 1.0);
    }

    #[test]
    fn test_supply_signal_only_when_candidate_has_it() {
        let without = Candidate::new("1", "Gaming Laptop", "electronics", 1000.0);
        let with = without.clone().with_signal("seasonal", 0.9);
        let extractor = VectorExtractor::new();

        assert!(extractor
            .supply_vectors(&without, &pattern())
            .iter()
            .all(|v| v.dimension != "seasonal"));
        assert!((find(&extractor.supply_vectors(&with, &pattern()), "seasonal").direction() - 0.8).abs() < 1e-6);
    }
}

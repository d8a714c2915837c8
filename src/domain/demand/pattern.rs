//! Demand pattern entity

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Inclusive price bounds of a demand
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether the bounds are finite and ordered
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Bounds ordered low to high, regardless of how they were submitted
    pub fn ordered(&self) -> (f64, f64) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        let (low, high) = self.ordered();
        price >= low && price <= high
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: f64::MAX,
        }
    }
}

/// An extra demand signal (e.g. "seasonal", "trending") with its strength
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSignal {
    #[serde(rename = "type")]
    pub signal_type: String,
    pub strength: f32,
}

impl ContextSignal {
    pub fn new(signal_type: impl Into<String>, strength: f32) -> Self {
        Self {
            signal_type: signal_type.into(),
            strength,
        }
    }
}

/// What a caller is searching for
///
/// Immutable once built; every matching request is identified by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandPattern {
    #[serde(alias = "query", alias = "term")]
    search_term: String,
    category: String,
    #[serde(default)]
    price_range: PriceRange,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    context_signals: Vec<ContextSignal>,
}

impl DemandPattern {
    pub fn new(
        search_term: impl Into<String>,
        category: impl Into<String>,
        price_range: PriceRange,
    ) -> Self {
        Self {
            search_term: search_term.into(),
            category: category.into(),
            price_range,
            context_signals: Vec::new(),
        }
    }

    pub fn with_signal(mut self, signal_type: impl Into<String>, strength: f32) -> Self {
        self.context_signals
            .push(ContextSignal::new(signal_type, strength));
        self
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price_range(&self) -> PriceRange {
        self.price_range
    }

    pub fn context_signals(&self) -> &[ContextSignal] {
        &self.context_signals
    }

    /// Reject patterns that cannot identify a search at all
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.search_term.trim().is_empty() && self.category.trim().is_empty() {
            return Err(DomainError::validation(
                "Demand pattern needs a search term or a category",
            ));
        }

        if !self.price_range.min.is_finite() || !self.price_range.max.is_finite() {
            return Err(DomainError::validation(format!(
                "Price range bounds must be finite, got [{}, {}]",
                self.price_range.min, self.price_range.max
            )));
        }

        Ok(())
    }
}

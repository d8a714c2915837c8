//! Supply-side candidate returned by a candidate source

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A product offered by an upstream source
///
/// Field aliases accept Awin product-feed column names. Any field the
/// matcher does not interpret is kept in `extra` and passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(alias = "aw_product_id")]
    pub id: String,
    #[serde(alias = "product_name", alias = "name")]
    pub title: String,
    #[serde(default, alias = "category_name")]
    pub category: String,
    #[serde(alias = "search_price")]
    pub price: f64,
    #[serde(default, alias = "merchant_name", skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, alias = "aw_deep_link", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Named supply signals in `[0, 1]`, compared against pattern context signals
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signals: BTreeMap<String, f32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            price,
            merchant: None,
            url: None,
            signals: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_signal(mut self, name: impl Into<String>, value: f32) -> Self {
        self.signals.insert(name.into(), value);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

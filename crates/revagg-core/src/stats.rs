//! Derived per-product analytics and their natural key.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TimePeriod;

/// Fixed sentiment categories, in the order they are stored.
pub const SENTIMENT_CATEGORIES: [&str; 4] = [
    "Product Quality",
    "User Experience",
    "Price Value",
    "Customer Service",
];

/// Natural key of a `product_stats` row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    pub product_id: Uuid,
    pub platform: String,
    pub time_period: TimePeriod,
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.product_id, self.platform, self.time_period)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCount {
    pub category: String,
    pub positive_count: u32,
    pub negative_count: u32,
    pub no_opinion_count: u32,
}

impl SentimentCount {
    #[must_use]
    pub fn zero(category: &str) -> Self {
        Self {
            category: category.to_string(),
            positive_count: 0,
            negative_count: 0,
            no_opinion_count: 0,
        }
    }
}

/// A complete analysis result for one `(product, platform, period)` key.
///
/// Always written whole; a later result for the same key replaces every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStats {
    pub product_id: Uuid,
    pub platform: String,
    pub time_period: TimePeriod,
    pub key_highlights: Vec<String>,
    pub pain_points: Vec<String>,
    pub overall_sentiment: String,
    pub sentiment_counts: Vec<SentimentCount>,
}

impl ProductStats {
    #[must_use]
    pub fn key(&self) -> UnitKey {
        UnitKey {
            product_id: self.product_id,
            platform: self.platform.clone(),
            time_period: self.time_period,
        }
    }
}

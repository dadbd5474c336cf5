//! Products, their review platforms, and the reviews collected from them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved platform tag for the "every platform combined" view.
pub const ALL_PLATFORMS_TAG: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Free-text description passed to the analysis model as context.
    pub description: String,
}

/// One external review source attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Lowercase source tag, e.g. `"trustpilot"` or `"amazon"`.
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub platform_id: Uuid,
    pub rating_value: f64,
    pub headline: Option<String>,
    pub review_body: String,
    pub published_at: DateTime<Utc>,
}

/// Which reviews a unit of analysis covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlatformSelector {
    /// Every platform of the product.
    All,
    /// Every platform row sharing `tag`. Rows with the same tag are merged so
    /// a single unit owns each `(product, tag, period)` key.
    Platform { tag: String, platform_ids: Vec<Uuid> },
}

impl PlatformSelector {
    /// The tag stored in `product_stats.platform`.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            PlatformSelector::All => ALL_PLATFORMS_TAG,
            PlatformSelector::Platform { tag, .. } => tag,
        }
    }
}

impl fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selector_uses_reserved_tag() {
        assert_eq!(PlatformSelector::All.tag(), "all");
    }

    #[test]
    fn platform_selector_uses_its_own_tag() {
        let selector = PlatformSelector::Platform {
            tag: "trustpilot".to_string(),
            platform_ids: vec![Uuid::new_v4()],
        };
        assert_eq!(selector.tag(), "trustpilot");
        assert_eq!(selector.to_string(), "trustpilot");
    }
}

//! Execution of a single analysis unit.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::try_join_all;
use revagg_analysis::ResponseShape;
use revagg_core::{
    PlatformSelector, Product, ProductStats, Review, SentimentCount, TimePeriod, UnitKey,
    SENTIMENT_CATEGORIES,
};
use uuid::Uuid;

use crate::analysis::{parse_sentiment, parse_summary, SummaryPayload};
use crate::error::{AnalysisKind, UnitError};
use crate::prompt::{sentiment_prompt, summary_prompt};
use crate::traits::{AnalysisClient, ReviewSource};

/// Overall sentiment recorded for a unit with no reviews.
pub const EMPTY_PERIOD_SENTIMENT: &str = "No reviews in this period.";

/// One `(product, platform selector, time period)` job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisUnit {
    pub product_id: Uuid,
    pub selector: PlatformSelector,
    pub time_period: TimePeriod,
}

impl AnalysisUnit {
    #[must_use]
    pub fn key(&self) -> UnitKey {
        UnitKey {
            product_id: self.product_id,
            platform: self.selector.tag().to_string(),
            time_period: self.time_period,
        }
    }
}

/// Turns the reviews of one unit into a complete [`ProductStats`] record.
///
/// All-or-nothing: a fetch error, an analysis error, or any malformed model
/// output fails the whole unit.
pub struct UnitExecutor {
    reviews: Arc<dyn ReviewSource>,
    analysis: Arc<dyn AnalysisClient>,
}

impl UnitExecutor {
    #[must_use]
    pub fn new(reviews: Arc<dyn ReviewSource>, analysis: Arc<dyn AnalysisClient>) -> Self {
        Self { reviews, analysis }
    }

    /// Runs `unit` with its time window resolved against `today`.
    ///
    /// # Errors
    ///
    /// - [`UnitError::Fetch`] when the review source fails.
    /// - [`UnitError::Analysis`] when an analysis call fails.
    /// - [`UnitError::Malformed`] when a call returns output that does not
    ///   match its schema.
    pub async fn execute(
        &self,
        product: &Product,
        unit: &AnalysisUnit,
        today: NaiveDate,
    ) -> Result<ProductStats, UnitError> {
        let window = unit.time_period.window_ending(today);
        let reviews = self
            .reviews
            .fetch_reviews(product.id, product.user_id, &unit.selector, window)
            .await
            .map_err(UnitError::Fetch)?;

        tracing::debug!(
            unit = %unit.key(),
            window = %window,
            reviews = reviews.len(),
            "executing analysis unit"
        );

        if reviews.is_empty() {
            return Ok(empty_stats(unit));
        }

        let sentiments = try_join_all(
            SENTIMENT_CATEGORIES
                .iter()
                .map(|category| self.sentiment(product, &reviews, category)),
        );
        let (summary, sentiment_counts) =
            tokio::try_join!(self.summary(product, &reviews), sentiments)?;

        Ok(ProductStats {
            product_id: unit.product_id,
            platform: unit.selector.tag().to_string(),
            time_period: unit.time_period,
            key_highlights: summary.key_highlights,
            pain_points: summary.pain_points,
            overall_sentiment: summary.overall_sentiment,
            sentiment_counts,
        })
    }

    async fn summary(&self, product: &Product, reviews: &[Review]) -> Result<SummaryPayload, UnitError> {
        let prompt = summary_prompt(&product.description, reviews);
        let raw = self
            .analysis
            .analyze(&prompt, ResponseShape::Object)
            .await
            .map_err(|source| UnitError::Analysis {
                kind: AnalysisKind::Summary,
                source,
            })?;

        parse_summary(&raw).map_err(|reason| UnitError::Malformed {
            kind: AnalysisKind::Summary,
            reason,
        })
    }

    async fn sentiment(
        &self,
        product: &Product,
        reviews: &[Review],
        category: &str,
    ) -> Result<SentimentCount, UnitError> {
        let kind = || AnalysisKind::Sentiment {
            category: category.to_string(),
        };
        let prompt = sentiment_prompt(category, &product.description, reviews);
        let raw = self
            .analysis
            .analyze(&prompt, ResponseShape::Object)
            .await
            .map_err(|source| UnitError::Analysis {
                kind: kind(),
                source,
            })?;

        parse_sentiment(&raw, category).map_err(|reason| UnitError::Malformed {
            kind: kind(),
            reason,
        })
    }
}

/// The deterministic record for a unit whose window holds no reviews.
#[must_use]
pub fn empty_stats(unit: &AnalysisUnit) -> ProductStats {
    ProductStats {
        product_id: unit.product_id,
        platform: unit.selector.tag().to_string(),
        time_period: unit.time_period,
        key_highlights: Vec::new(),
        pain_points: Vec::new(),
        overall_sentiment: EMPTY_PERIOD_SENTIMENT.to_string(),
        sentiment_counts: SENTIMENT_CATEGORIES
            .iter()
            .map(|category| SentimentCount::zero(category))
            .collect(),
    }
}

use std::fmt;

use revagg_analysis::LlmError;
use revagg_core::UnitKey;
use revagg_db::DbError;
use thiserror::Error;
use uuid::Uuid;

/// Error returned by a collaborator (catalog, review source, analysis
/// client, stats store).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("{0}")]
    Other(String),
}

/// Which analysis call of a unit an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    Summary,
    Sentiment { category: String },
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::Summary => write!(f, "summary"),
            AnalysisKind::Sentiment { category } => write!(f, "sentiment[{category}]"),
        }
    }
}

/// Why a single analysis unit did not produce a row.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("fetching reviews failed: {0}")]
    Fetch(#[source] BackendError),

    #[error("{kind} analysis failed: {source}")]
    Analysis {
        kind: AnalysisKind,
        #[source]
        source: BackendError,
    },

    #[error("{kind} analysis returned malformed output: {reason}")]
    Malformed { kind: AnalysisKind, reason: String },

    #[error("persisting stats failed: {0}")]
    Persist(#[source] BackendError),

    #[error("cancelled before start")]
    Cancelled,

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Errors returned by [`crate::StatsPipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("product {product_id} not found for user {user_id}")]
    ProductNotFound { product_id: Uuid, user_id: Uuid },

    #[error("product {product_id} has no platforms")]
    NoPlatforms { product_id: Uuid },

    #[error("product {product_id} has a platform named '{tag}', which is reserved")]
    ReservedPlatformTag { product_id: Uuid, tag: String },

    #[error("loading catalog failed: {0}")]
    Catalog(#[source] BackendError),

    #[error("recording stats run failed: {0}")]
    RunRecord(#[source] DbError),

    #[error("{failed} of {total} analysis units failed: {}", describe_failures(.failures))]
    UnitsFailed {
        failed: usize,
        total: usize,
        succeeded: Vec<UnitKey>,
        failures: Vec<(UnitKey, UnitError)>,
    },
}

impl PipelineError {
    /// `(total, failed)` unit counts, zero for errors raised before dispatch.
    #[must_use]
    pub fn unit_counts(&self) -> (usize, usize) {
        match self {
            PipelineError::UnitsFailed { failed, total, .. } => (*total, *failed),
            _ => (0, 0),
        }
    }
}

fn describe_failures(failures: &[(UnitKey, UnitError)]) -> String {
    failures
        .iter()
        .map(|(key, err)| format!("{key} ({err})"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use revagg_core::TimePeriod;

    use super::*;

    #[test]
    fn units_failed_message_lists_each_failure() {
        let product_id = Uuid::nil();
        let key = |platform: &str| UnitKey {
            product_id,
            platform: platform.to_string(),
            time_period: TimePeriod::AllTime,
        };
        let err = PipelineError::UnitsFailed {
            failed: 2,
            total: 3,
            succeeded: vec![key("all")],
            failures: vec![
                (key("amazon"), UnitError::Cancelled),
                (
                    key("trustpilot"),
                    UnitError::Malformed {
                        kind: AnalysisKind::Summary,
                        reason: "no JSON object found".to_string(),
                    },
                ),
            ],
        };

        assert_eq!(
            err.to_string(),
            "2 of 3 analysis units failed: \
             00000000-0000-0000-0000-000000000000/amazon/all_time (cancelled before start); \
             00000000-0000-0000-0000-000000000000/trustpilot/all_time \
             (summary analysis returned malformed output: no JSON object found)"
        );
        assert_eq!(err.unit_counts(), (3, 2));
    }

    #[test]
    fn sentiment_kind_names_its_category() {
        let kind = AnalysisKind::Sentiment {
            category: "Price Value".to_string(),
        };
        assert_eq!(kind.to_string(), "sentiment[Price Value]");
    }
}

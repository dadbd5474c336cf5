//! Strict schemas for model output.
//!
//! A payload is accepted only if it matches the schema exactly: unknown
//! fields, missing fields, and negative or fractional counts are rejected.

use revagg_analysis::ResponseShape;
use revagg_core::SentimentCount;
use serde::Deserialize;

use crate::extract::extract_json;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryPayload {
    pub key_highlights: Vec<String>,
    pub pain_points: Vec<String>,
    pub overall_sentiment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct SentimentPayload {
    category: String,
    positive: u32,
    negative: u32,
    no_opinion: u32,
}

/// Parses the summary call's raw output.
///
/// # Errors
///
/// Returns a human-readable reason when no JSON object is present or it
/// does not match the summary schema.
pub fn parse_summary(raw: &str) -> Result<SummaryPayload, String> {
    let json = extract_json(raw, ResponseShape::Object).ok_or_else(no_object)?;
    serde_json::from_str(&json).map_err(|e| format!("summary schema mismatch: {e}"))
}

/// Parses one sentiment call's raw output for `category`.
///
/// # Errors
///
/// Returns a human-readable reason when no JSON object is present, it does
/// not match the sentiment schema, or it reports a different category.
pub fn parse_sentiment(raw: &str, category: &str) -> Result<SentimentCount, String> {
    let json = extract_json(raw, ResponseShape::Object).ok_or_else(no_object)?;
    let payload: SentimentPayload =
        serde_json::from_str(&json).map_err(|e| format!("sentiment schema mismatch: {e}"))?;

    if !payload.category.trim().eq_ignore_ascii_case(category.trim()) {
        return Err(format!(
            "expected category '{category}', got '{}'",
            payload.category
        ));
    }

    Ok(SentimentCount {
        category: category.to_string(),
        positive_count: payload.positive,
        negative_count: payload.negative,
        no_opinion_count: payload.no_opinion,
    })
}

fn no_object() -> String {
    "no JSON object found in model output".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_parsed_from_noisy_output() {
        let raw = "<think>let me see {hmm}</think>Here you go:\n\
                   {\"key_highlights\": [\"Comfortable\"], \"pain_points\": [], \
                   \"overall_sentiment\": \"Positive\"}";
        let summary = parse_summary(raw).unwrap();
        assert_eq!(summary.key_highlights, vec!["Comfortable".to_string()]);
        assert!(summary.pain_points.is_empty());
        assert_eq!(summary.overall_sentiment, "Positive");
    }

    #[test]
    fn summary_with_unknown_field_is_rejected() {
        let raw = r#"{"key_highlights": [], "pain_points": [], "overall_sentiment": "ok", "score": 3}"#;
        let reason = parse_summary(raw).unwrap_err();
        assert!(reason.contains("score"), "reason: {reason}");
    }

    #[test]
    fn summary_with_missing_field_is_rejected() {
        let raw = r#"{"key_highlights": [], "overall_sentiment": "ok"}"#;
        assert!(parse_summary(raw).is_err());
    }

    #[test]
    fn summary_without_json_is_rejected() {
        let reason = parse_summary("Sorry, I cannot help with that.").unwrap_err();
        assert_eq!(reason, "no JSON object found in model output");
    }

    #[test]
    fn sentiment_category_matches_case_insensitively() {
        let raw = r#"{"category": "  product quality ", "positive": 3, "negative": 1, "no_opinion": 0}"#;
        let count = parse_sentiment(raw, "Product Quality").unwrap();
        assert_eq!(
            count,
            SentimentCount {
                category: "Product Quality".to_string(),
                positive_count: 3,
                negative_count: 1,
                no_opinion_count: 0,
            }
        );
    }

    #[test]
    fn sentiment_for_wrong_category_is_rejected() {
        let raw = r#"{"category": "Price Value", "positive": 3, "negative": 1, "no_opinion": 0}"#;
        let reason = parse_sentiment(raw, "Customer Service").unwrap_err();
        assert!(reason.contains("Customer Service"), "reason: {reason}");
    }

    #[test]
    fn negative_or_fractional_counts_are_rejected() {
        let negative = r#"{"category": "Price Value", "positive": -1, "negative": 1, "no_opinion": 0}"#;
        let fractional = r#"{"category": "Price Value", "positive": 1.5, "negative": 1, "no_opinion": 0}"#;
        assert!(parse_sentiment(negative, "Price Value").is_err());
        assert!(parse_sentiment(fractional, "Price Value").is_err());
    }

    #[test]
    fn legacy_nested_sentiment_shape_is_rejected() {
        let raw = r#"{"price_value": {"positive": 0, "negative": 0, "neutral": 0}}"#;
        assert!(parse_sentiment(raw, "Price Value").is_err());
    }
}

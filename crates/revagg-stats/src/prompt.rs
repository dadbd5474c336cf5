//! Prompt construction for the summary and per-category sentiment calls.

use revagg_analysis::Prompt;
use revagg_core::Review;
use serde_json::{json, Value};

const SUMMARY_SYSTEM: &str = r#"You are a review analyzer. Analyze the product reviews and reply with key highlights and pain points strictly as JSON.
Reply with exactly one JSON object and nothing else: no explanations, no introductions, no markdown.
Required structure:

{
  "key_highlights": ["highlight1", "highlight2"],
  "pain_points": ["issue1", "issue2"],
  "overall_sentiment": "brief summary of customer satisfaction"
}

"key_highlights" and "pain_points" are arrays of strings; use an empty array when there are none.
"overall_sentiment" is a single string summarizing all reviews.
Do not put curly brackets inside <think> tags.
Do not nest these fields inside another object and do not add any other fields."#;

/// Prompt for the summary call.
#[must_use]
pub fn summary_prompt(product_description: &str, reviews: &[Review]) -> Prompt {
    Prompt::new(
        SUMMARY_SYSTEM,
        format!(
            "Summarize the following product reviews.\n\nProduct Description: {product_description}\n\nReviews: {}",
            reviews_json(reviews)
        ),
    )
}

/// Prompt for the sentiment count of one category.
#[must_use]
pub fn sentiment_prompt(category: &str, product_description: &str, reviews: &[Review]) -> Prompt {
    let system = format!(
        r#"You are a sentiment analyzer. Count how many reviews are positive, negative or express no opinion about "{category}".
Reply with exactly one JSON object and nothing else: no explanations, no introductions, no markdown.
Required structure:

{{
  "category": "{category}",
  "positive": 0,
  "negative": 0,
  "no_opinion": 0
}}

Counts are non-negative integers. A review that says nothing about {category} counts as "no_opinion".
Do not put curly brackets inside <think> tags.
Do not nest these fields inside another object and do not add any other fields."#
    );

    Prompt::new(
        system,
        format!(
            "Count sentiment about \"{category}\" in the following product reviews.\n\nProduct Description: {product_description}\n\nReviews: {}",
            reviews_json(reviews)
        ),
    )
}

/// Reviews as a JSON array of `{rating, body}` objects.
fn reviews_json(reviews: &[Review]) -> String {
    Value::Array(
        reviews
            .iter()
            .map(|r| json!({ "rating": r.rating_value, "body": r.review_body }))
            .collect(),
    )
    .to_string()
}

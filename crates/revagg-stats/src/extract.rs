//! Locating the JSON payload inside free-form model output.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use revagg_analysis::ResponseShape;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think regex"));

/// Opening delimiters tried before giving up. Each attempt parses the rest of
/// the text, so the total work is bounded by this times the input length.
const MAX_CANDIDATES: usize = 64;

/// Removes every `<think>…</think>` block.
pub fn strip_think_blocks(raw: &str) -> Cow<'_, str> {
    THINK_BLOCK.replace_all(raw, "")
}

/// Returns the first complete JSON value of `shape` found in `raw`.
///
/// Reasoning blocks are dropped first, then every opening delimiter of the
/// expected shape is tried in order until one starts a well-formed value.
/// `None` when no such value exists within the first `MAX_CANDIDATES`
/// delimiters.
#[must_use]
pub fn extract_json(raw: &str, shape: ResponseShape) -> Option<String> {
    let cleaned = strip_think_blocks(raw);
    let opening = shape.opening();

    let starts = cleaned
        .char_indices()
        .filter(|&(_, ch)| ch == opening)
        .map(|(start, _)| start)
        .take(MAX_CANDIDATES);

    for start in starts {
        let tail = &cleaned[start..];
        let mut values = serde_json::Deserializer::from_str(tail).into_iter::<serde_json::Value>();
        if let Some(Ok(_)) = values.next() {
            let end = values.byte_offset();
            return Some(tail[..end].to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object_is_returned_as_is() {
        let raw = r#"{"a": 1}"#;
        assert_eq!(extract_json(raw, ResponseShape::Object).as_deref(), Some(raw));
    }

    #[test]
    fn commentary_around_object_is_dropped() {
        let raw = "Sure! Here is the analysis:\n{\"a\": [1, 2]}\nLet me know if you need more.";
        assert_eq!(
            extract_json(raw, ResponseShape::Object).as_deref(),
            Some("{\"a\": [1, 2]}")
        );
    }

    #[test]
    fn think_block_with_braces_is_ignored() {
        let raw = "<think>maybe {\"a\": 0} is right?\nor {broken</think>\n{\"a\": 2}";
        assert_eq!(
            extract_json(raw, ResponseShape::Object).as_deref(),
            Some("{\"a\": 2}")
        );
    }

    #[test]
    fn broken_candidate_is_skipped_for_later_value() {
        let raw = "use {this} format: {\"ok\": true} and {\"second\": 1}";
        assert_eq!(
            extract_json(raw, ResponseShape::Object).as_deref(),
            Some("{\"ok\": true}")
        );
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_value() {
        let raw = r#"{"note": "use } carefully", "n": 1} trailing"#;
        assert_eq!(
            extract_json(raw, ResponseShape::Object).as_deref(),
            Some(r#"{"note": "use } carefully", "n": 1}"#)
        );
    }

    #[test]
    fn array_shape_looks_for_brackets() {
        let raw = "result: [\"x\", \"y\"] done";
        assert_eq!(
            extract_json(raw, ResponseShape::Array).as_deref(),
            Some("[\"x\", \"y\"]")
        );
    }

    #[test]
    fn gives_up_after_too_many_broken_candidates() {
        let noise = "{x ".repeat(MAX_CANDIDATES - 1);
        let within = format!("{noise}{{\"a\": 1}}");
        assert_eq!(
            extract_json(&within, ResponseShape::Object).as_deref(),
            Some("{\"a\": 1}")
        );

        let beyond = format!("{noise}{{x {{\"a\": 1}}");
        assert_eq!(extract_json(&beyond, ResponseShape::Object), None);
    }

    #[test]
    fn text_without_json_yields_none() {
        assert_eq!(extract_json("I could not analyze these reviews.", ResponseShape::Object), None);
        assert_eq!(extract_json("<think>{\"a\":1}</think>", ResponseShape::Object), None);
        assert_eq!(extract_json("{\"unterminated\": ", ResponseShape::Object), None);
    }
}

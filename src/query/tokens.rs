//! Token estimator: predicts the token cost of a response before it ships.
//!
//! Deliberately conservative — over-counting shrinks a page, under-counting
//! blows the caller's context window, so the 20% structural overhead always
//! rounds up.

use serde_json::Value;

/// Structural punctuation overhead applied on top of the 4-chars-per-token
/// baseline.
const OVERHEAD: f64 = 1.2;

/// Fixed cost of one result's path and metadata fields.
pub const RESULT_BASE_TOKENS: usize = 10;

/// Cost of one context line.
pub const CONTEXT_LINE_TOKENS: usize = 20;

/// Estimate tokens for raw text. Empty input costs nothing.
pub fn estimate_text(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let quarters = text.chars().count().div_ceil(4);
    (quarters as f64 * OVERHEAD).ceil() as usize
}

/// Estimate tokens for any JSON value, measured in its serialized wire form.
/// Raw strings skip serialization (their quotes never reach the client).
pub fn estimate_value(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::String(s) => estimate_text(s),
        other => {
            let serialized = serde_json::to_string(other).unwrap_or_default();
            estimate_text(&serialized)
        }
    }
}

/// Estimate tokens for a shaped search result: base cost for path and
/// metadata, the match text itself, and a per-context-line contribution.
pub fn result_cost(match_len_chars: usize, context_lines: usize) -> usize {
    RESULT_BASE_TOKENS
        + (match_len_chars.div_ceil(4) as f64 * OVERHEAD).ceil() as usize
        + context_lines * CONTEXT_LINE_TOKENS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_inputs_cost_zero() {
        assert_eq!(estimate_text(""), 0);
        assert_eq!(estimate_value(&Value::Null), 0);
        assert_eq!(estimate_value(&json!("")), 0);
    }

    #[test]
    fn test_four_chars_round_up() {
        // 4 chars → 1 quarter → ceil(1.2) = 2
        assert_eq!(estimate_text("abcd"), 2);
        // 1 char still costs at least one token
        assert!(estimate_text("a") >= 1);
    }

    #[test]
    fn test_scales_linearly_with_length() {
        let short = estimate_text(&"x".repeat(100));
        let long = estimate_text(&"x".repeat(10_000));
        assert_eq!(long, short * 100);
    }

    #[test]
    fn test_never_undercounts_long_strings() {
        let s = "y".repeat(40_000);
        // Baseline is len/4; the estimate must sit above it.
        assert!(estimate_text(&s) >= 10_000);
    }

    #[test]
    fn test_object_measured_in_wire_form() {
        let v = json!({ "path": "src/lib.rs", "line": 42 });
        let serialized = serde_json::to_string(&v).unwrap();
        assert_eq!(estimate_value(&v), estimate_text(&serialized));
    }

    #[test]
    fn test_deterministic() {
        let v = json!({ "a": [1, 2, 3], "b": "text" });
        assert_eq!(estimate_value(&v), estimate_value(&v));
    }

    #[test]
    fn test_result_cost_includes_context_lines() {
        let bare = result_cost(20, 0);
        let with_ctx = result_cost(20, 5);
        assert_eq!(with_ctx - bare, 5 * CONTEXT_LINE_TOKENS);
        assert!(bare >= RESULT_BASE_TOKENS);
    }
}

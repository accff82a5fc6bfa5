//! Shared helpers for MCP tool handlers: argument extraction, unknown-field
//! warnings, metrics injection, and the response size guard.

use std::time::Instant;

use serde_json::{json, Value};

use crate::error::CommonMistake;
use crate::mcp::protocol::ToolCallResult;
use crate::query::tokens::estimate_text;

use super::HandlerContext;

// ─── Argument extraction ────────────────────────────────────────────

pub(crate) fn get_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

pub(crate) fn get_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

pub(crate) fn get_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

pub(crate) fn get_f64(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

/// String list argument: accepts an array of strings or one comma-separated
/// string — AI clients send both.
pub(crate) fn get_str_list(args: &Value, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

// ─── Unknown-field warnings ─────────────────────────────────────────

/// Unknown argument fields never fail a call; they come back as warnings
/// with a corrected example so clients can iterate.
pub(crate) fn unknown_field_warnings(
    args: &Value,
    known: &[&str],
    tool: &str,
) -> (Vec<String>, Vec<CommonMistake>) {
    let mut warnings = Vec::new();
    let mut mistakes = Vec::new();
    if let Some(obj) = args.as_object() {
        for key in obj.keys() {
            if !known.contains(&key.as_str()) {
                warnings.push(format!(
                    "unknown argument '{}' ignored; known arguments: {}",
                    key,
                    known.join(", ")
                ));
                mistakes.push(CommonMistake {
                    mistake: format!(r#"{{"{}": ...}}"#, key),
                    corrected: format!("call info with {{\"tool\": \"{}\"}} for the argument list", tool),
                });
            }
        }
    }
    (warnings, mistakes)
}

/// Append warnings (and common mistakes) to a successful JSON response.
/// Non-JSON payloads (LCF text) pass through untouched.
pub(crate) fn inject_warnings(
    result: ToolCallResult,
    warnings: &[String],
    mistakes: &[CommonMistake],
) -> ToolCallResult {
    if result.is_error || warnings.is_empty() {
        return result;
    }
    let Some(text) = result.content.first().map(|c| c.text.clone()) else {
        return result;
    };
    let Ok(mut output) = serde_json::from_str::<Value>(&text) else {
        return result;
    };
    if !output.is_object() {
        return result;
    }

    let existing = output
        .get("warnings")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut merged = existing;
    merged.extend(warnings.iter().map(|w| json!(w)));
    output["warnings"] = Value::Array(merged);

    if !mistakes.is_empty() {
        output["commonMistakes"] = json!(mistakes
            .iter()
            .map(|m| json!({ "mistake": m.mistake, "corrected": m.corrected }))
            .collect::<Vec<_>>());
    }

    ToolCallResult::success(serde_json::to_string(&output).unwrap_or(text))
}

// ─── Metrics injection ──────────────────────────────────────────────

/// Inject performance metrics into a successful JSON response's summary:
/// query time, response size, estimated tokens, and index dimensions.
pub(crate) fn inject_metrics(
    result: ToolCallResult,
    ctx: &HandlerContext,
    start: Instant,
) -> ToolCallResult {
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let Some(text) = result.content.first().map(|c| c.text.clone()) else {
        return result;
    };
    if result.is_error {
        return result;
    }

    let Ok(mut output) = serde_json::from_str::<Value>(&text) else {
        return result;
    };
    if !output.is_object() {
        return result;
    }
    if output.get("summary").is_none() {
        output["summary"] = json!({});
    }

    let summary = &mut output["summary"];
    summary["queryTimeMs"] = json!((elapsed_ms * 100.0).round() / 100.0);
    if let Ok(idx) = ctx.index.read() {
        summary["indexFiles"] = json!(idx.files.len());
        summary["indexSymbols"] = json!(idx.symbols.len());
        summary["indexGeneration"] = json!(idx.generation);
    }

    let serialized = serde_json::to_string(&output).unwrap_or(text);
    let bytes = serialized.len();
    let Ok(mut output) = serde_json::from_str::<Value>(&serialized) else {
        return ToolCallResult::success(serialized);
    };
    output["summary"]["responseBytes"] = json!(bytes);
    output["summary"]["estimatedTokens"] = json!(estimate_text(&serialized));

    ToolCallResult::success(serde_json::to_string(&output).unwrap_or(serialized))
}

// ─── Response size guard ────────────────────────────────────────────

/// Outer safety net behind the token-budget shaping: hard-truncate any
/// payload above the byte limit, with an explicit notice.
pub(crate) fn truncate_response_if_needed(
    result: ToolCallResult,
    max_bytes: usize,
) -> ToolCallResult {
    if max_bytes == 0 || result.is_error {
        return result;
    }
    let Some(text) = result.content.first().map(|c| &c.text) else {
        return result;
    };
    if text.len() <= max_bytes {
        return result;
    }

    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let notice = format!(
        "\n… response truncated at {} bytes (of {}). Narrow the query or use output=count.",
        cut,
        text.len()
    );
    ToolCallResult::success(format!("{}{}", &text[..cut], notice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_str_list_accepts_both_shapes() {
        let args = json!({ "a": ["x", "y"], "b": "x, y ,z" });
        assert_eq!(get_str_list(&args, "a"), vec!["x", "y"]);
        assert_eq!(get_str_list(&args, "b"), vec!["x", "y", "z"]);
        assert!(get_str_list(&args, "missing").is_empty());
    }

    #[test]
    fn test_unknown_field_warnings() {
        let args = json!({ "pattern": "x", "patern": "typo" });
        let (warnings, mistakes) =
            unknown_field_warnings(&args, &["pattern", "max"], "search");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("patern"));
        assert_eq!(mistakes.len(), 1);
    }

    #[test]
    fn test_inject_warnings_merges_existing() {
        let result = ToolCallResult::success(r#"{"warnings":["old"],"results":[]}"#.to_string());
        let out = inject_warnings(result, &["new".to_string()], &[]);
        let v: Value = serde_json::from_str(&out.content[0].text).unwrap();
        let warnings = v["warnings"].as_array().unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_inject_warnings_skips_non_json() {
        let result = ToolCallResult::success("LCF/1.0\nmode=overview tier=1\n".to_string());
        let out = inject_warnings(result, &["w".to_string()], &[]);
        assert!(out.content[0].text.starts_with("LCF/1.0"));
    }

    #[test]
    fn test_truncate_response() {
        let long = "a".repeat(100);
        let result = ToolCallResult::success(long);
        let out = truncate_response_if_needed(result, 50);
        assert!(out.content[0].text.starts_with(&"a".repeat(50)));
        assert!(out.content[0].text.contains("truncated"));
    }

    #[test]
    fn test_truncate_disabled_with_zero() {
        let long = "a".repeat(100);
        let result = ToolCallResult::success(long.clone());
        let out = truncate_response_if_needed(result, 0);
        assert_eq!(out.content[0].text, long);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let text = "é".repeat(40); // 2 bytes per char
        let result = ToolCallResult::success(text);
        let out = truncate_response_if_needed(result, 33);
        assert!(out.content[0].text.contains("truncated"));
    }
}

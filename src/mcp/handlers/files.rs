//! `files` handler: fuzzy file path search over the indexed path table.

use serde_json::{json, Value};

use crate::cancel::CancelToken;
use crate::error::{CommonMistake, LciError};
use crate::mcp::protocol::ToolCallResult;
use crate::query::files::{search_paths, FileSearchOptions};

use super::utils::{get_bool, get_str, get_str_list, get_usize};
use super::HandlerContext;

pub(super) fn handle_files(
    ctx: &HandlerContext,
    args: &Value,
    cancel: &CancelToken,
) -> Result<ToolCallResult, LciError> {
    let Some(pattern) = get_str(args, "pattern").filter(|p| !p.trim().is_empty()) else {
        return Err(LciError::validation(
            "pattern",
            "a file path pattern is required",
            "",
            "E_NO_PATTERN",
            vec![CommonMistake {
                mistake: r#"{"directory": "src"}"#.to_string(),
                corrected: r#"{"pattern": "user handler", "directory": "src"}"#.to_string(),
            }],
        ));
    };

    // Path matching is case-insensitive by nature; flags are accepted for
    // interface symmetry and autocorrected like everywhere else.
    let flag_parse = crate::query::flags::parse_flags(&get_str(args, "flags").unwrap_or_default());
    let warnings = flag_parse.warnings;

    let options = FileSearchOptions {
        max: get_usize(args, "max").unwrap_or(0),
        languages: get_str_list(args, "languages")
            .into_iter()
            .map(|l| l.trim_start_matches('.').to_lowercase())
            .collect(),
        filter: get_str(args, "filter"),
        directory: get_str(args, "directory"),
        include_hidden: get_bool(args, "include_hidden").unwrap_or(false),
    };

    cancel.check()?;
    let index = ctx
        .index
        .read()
        .map_err(|e| LciError::internal(format!("index lock poisoned: {}", e)))?;

    let matches = search_paths(index.files.paths(), &pattern, &options);

    let output = json!({
        "summary": {
            "total": matches.len(),
            "pattern": pattern,
        },
        "files": matches.iter().map(|m| json!({
            "path": m.path,
            "score": (m.score * 10000.0).round() / 10000.0,
            "matchedPatterns": m.matched_patterns,
        })).collect::<Vec<_>>(),
        "warnings": warnings,
    });
    Ok(ToolCallResult::success(output.to_string()))
}

//! `get_context` handler: argument parsing around the context lookup engine.

use serde_json::Value;

use crate::cancel::CancelToken;
use crate::error::LciError;
use crate::mcp::protocol::ToolCallResult;
use crate::query::context::{lookup_context, ContextMode, ContextRequest, Section};

use super::utils::{get_bool, get_f64, get_str, get_str_list, get_usize};
use super::HandlerContext;

pub(super) fn handle_get_context(
    ctx: &HandlerContext,
    args: &Value,
    cancel: &CancelToken,
) -> Result<ToolCallResult, LciError> {
    let mut warnings: Vec<String> = Vec::new();

    let ids: Vec<String> = get_str(args, "id")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mode = match get_str(args, "mode") {
        Some(m) => match ContextMode::parse(&m) {
            Some(mode) => mode,
            None => {
                warnings.push(format!(
                    "unknown mode '{}' ignored; valid: full, quick, relationships, semantic, usage, variables",
                    m
                ));
                ContextMode::Full
            }
        },
        None => ContextMode::Full,
    };

    let mut parse_sections = |key: &str| -> Vec<Section> {
        let mut sections = Vec::new();
        for raw in get_str_list(args, key) {
            match Section::parse(&raw) {
                Some(s) => sections.push(s),
                None => warnings.push(format!(
                    "unknown section '{}' in {} ignored; valid: relationships, variables, semantic, structure, usage, ai",
                    raw, key
                )),
            }
        }
        sections
    };
    let include_sections = parse_sections("include_sections");
    let exclude_sections = parse_sections("exclude_sections");

    let request = ContextRequest {
        ids,
        name: get_str(args, "name"),
        file_id: get_usize(args, "file_id").map(|v| v as u32),
        mode,
        include_sections,
        exclude_sections,
        max_depth: get_usize(args, "max_depth"),
        include_ai_text: get_bool(args, "include_ai_text"),
        confidence_threshold: get_f64(args, "confidence_threshold").unwrap_or(0.0) as f32,
    };

    let index = ctx
        .index
        .read()
        .map_err(|e| LciError::internal(format!("index lock poisoned: {}", e)))?;

    let mut output = lookup_context(&index, &request, cancel)?;
    output["warnings"] = serde_json::json!(warnings);
    Ok(ToolCallResult::success(output.to_string()))
}

//! `code_insight` handler: parses the mode/analysis arguments and returns
//! the LCF/1.0 payload.

use serde_json::Value;

use crate::cancel::CancelToken;
use crate::error::{CommonMistake, LciError};
use crate::insight::{code_insight, DetailedAnalysis, InsightMode, InsightRequest};
use crate::mcp::protocol::ToolCallResult;

use super::utils::{get_str, get_str_list, get_usize};
use super::HandlerContext;

pub(super) fn handle_code_insight(
    ctx: &HandlerContext,
    args: &Value,
    cancel: &CancelToken,
) -> Result<ToolCallResult, LciError> {
    let mode = match get_str(args, "mode") {
        Some(m) => Some(InsightMode::parse(&m).ok_or_else(|| {
            LciError::validation(
                "mode",
                "expected overview, detailed, statistics, unified, or structure",
                m.clone(),
                "E_MODE",
                vec![CommonMistake {
                    mistake: format!(r#"{{"mode": "{}"}}"#, m),
                    corrected: r#"{"mode": "overview"}"#.to_string(),
                }],
            )
        })?),
        None => None,
    };

    let analysis = match get_str(args, "analysis") {
        Some(a) => Some(DetailedAnalysis::parse(&a).ok_or_else(|| {
            LciError::validation(
                "analysis",
                "expected modules, layers, features, terms, or relationships",
                a.clone(),
                "E_ANALYSIS",
                vec![CommonMistake {
                    mistake: format!(r#"{{"analysis": "{}"}}"#, a),
                    corrected: r#"{"mode": "detailed", "analysis": "modules"}"#.to_string(),
                }],
            )
        })?),
        None => None,
    };

    let request = InsightRequest {
        mode,
        analysis,
        metrics: get_str_list(args, "metrics"),
        tier: get_usize(args, "tier").map(|t| t.min(3) as u8),
    };

    let index = ctx
        .index
        .read()
        .map_err(|e| LciError::internal(format!("index lock poisoned: {}", e)))?;

    let lcf = code_insight(&index, &request, &ctx.health, cancel)?;
    Ok(ToolCallResult::success(lcf))
}

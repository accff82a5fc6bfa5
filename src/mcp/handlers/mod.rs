//! MCP tool handlers — dispatches tool calls to specialized handler modules.

mod annotations;
mod context;
mod files;
mod insight;
mod search;
pub(crate) mod utils;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use serde_json::{json, Value};
use tracing::warn;

use crate::cancel::CancelToken;
use crate::error::LciError;
use crate::index::CodeIndex;
use crate::indexer::{AutoIndexManager, IndexingState};
use crate::insight::health::HealthOptions;
use crate::mcp::protocol::{ToolCallResult, ToolDefinition};
use crate::query::paginate::PaginationConfig;
use crate::semantic::SemanticCache;

// ─── Handler context ────────────────────────────────────────────────

/// Per-tool query counters. Mutations take this one short lock.
#[derive(Debug, Default)]
pub struct QueryCounters {
    pub total: u64,
    pub per_tool: HashMap<String, u64>,
}

/// Shared state for tool handlers. Constructed once per server; every
/// singleton lives here — no free-standing globals.
pub struct HandlerContext {
    pub index: Arc<RwLock<CodeIndex>>,
    pub indexer: Arc<AutoIndexManager>,
    pub semantic: SemanticCache,
    pub health: HealthOptions,
    pub pagination: PaginationConfig,
    pub metrics: bool,
    /// Response byte guard; 0 disables.
    pub max_response_bytes: usize,
    pub counters: Mutex<QueryCounters>,
    /// Root cancel token; tripped on shutdown.
    pub cancel: CancelToken,
}

impl HandlerContext {
    pub fn new(
        index: Arc<RwLock<CodeIndex>>,
        indexer: Arc<AutoIndexManager>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            index,
            indexer,
            semantic: SemanticCache::new(),
            health: HealthOptions::default(),
            pagination: PaginationConfig::default(),
            metrics: false,
            max_response_bytes: 16 * 1024,
            counters: Mutex::new(QueryCounters::default()),
            cancel,
        }
    }
}

// ─── Tool definitions ───────────────────────────────────────────────

/// Return all tool definitions for tools/list
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "search".to_string(),
            description: "Multi-pattern code search over the in-memory index. Multi-word patterns expand per word and results matching several words rank higher (+15% per extra word, capped at +50%). Semantic expansion (fuzzy, stems, abbreviations, camelCase splits) is on by default. Output detail adapts to match score and the whole response fits a token budget. Every result carries an object ID — pass it to get_context for deep context.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string", "description": "Search pattern. Multi-word input expands into per-word patterns." },
                    "patterns": { "type": "array", "items": { "type": "string" }, "description": "Explicit pattern list (alternative to pattern)." },
                    "max": { "type": "integer", "description": "Max results (default 50, hard cap 100)." },
                    "output": { "type": "string", "description": "line | ctx | ctx:N | full | files | count (default ctx)." },
                    "filter": { "type": "string", "description": "Path filter, substring or * glob. Prefix with ! to exclude." },
                    "flags": { "type": "string", "description": "Comma flags: ci (case-insensitive), rx (regex), iv (invert), wb (word boundary), nt (no tests), nc (no comments). Common aliases autocorrect." },
                    "symbol_types": { "type": "string", "description": "Comma symbol kinds, e.g. 'function,struct'. Aliases and typos resolve with warnings." },
                    "max_per_file": { "type": "integer", "description": "Cap matches per file." },
                    "languages": { "type": "string", "description": "Comma extension filter, e.g. 'rs,go'." },
                    "semantic": { "type": "boolean", "description": "Semantic expansion (default true)." },
                    "include": { "type": "array", "items": { "type": "string" }, "description": "Optional metadata: breadcrumbs, safety, refs, deps." },
                    "group": { "type": "string", "description": "Group results by file, symbol_type, or directory." },
                    "page": { "type": "integer", "description": "0-based page index." }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_context".to_string(),
            description: "Resolve object IDs returned by search into deep symbol context: structure, relationships, variables, semantic labels, usage, and an optional AI summary. Accepts comma-separated IDs, or a legacy name + file_id pair (exactly one addressing form).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Comma-separated object IDs from search results." },
                    "name": { "type": "string", "description": "Legacy: symbol name (combine with file_id)." },
                    "file_id": { "type": "integer", "description": "Legacy: file id scoping the name lookup." },
                    "mode": { "type": "string", "enum": ["full", "quick", "relationships", "semantic", "usage", "variables"], "description": "Preset: full = everything at depth 5; quick = relationships + structure at depth 2; the rest select one section." },
                    "include_sections": { "type": "array", "items": { "type": "string" }, "description": "Sections to keep: relationships, variables, semantic, structure, usage, ai." },
                    "exclude_sections": { "type": "array", "items": { "type": "string" }, "description": "Sections to drop (wins over include)." },
                    "max_depth": { "type": "integer", "description": "Relationship traversal bound." },
                    "include_ai_text": { "type": "boolean", "description": "Include the plain-language summary." },
                    "confidence_threshold": { "type": "number", "description": "Minimum semantic label strength." }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "files".to_string(),
            description: "Fuzzy file path search over the indexed file table. Multi-word patterns match per word with the same coverage boost as search. Hidden directories are excluded unless include_hidden is set.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string", "description": "Path pattern." },
                    "max": { "type": "integer", "description": "Max paths (default 50, hard cap 200)." },
                    "filter": { "type": "string", "description": "Substring or * glob path filter." },
                    "flags": { "type": "string", "description": "Accepted for symmetry with search; path matching is always case-insensitive." },
                    "directory": { "type": "string", "description": "Restrict to one directory." },
                    "languages": { "type": "string", "description": "Comma extension filter." },
                    "include_hidden": { "type": "boolean", "description": "Include dot-directories (default false)." }
                },
                "required": ["pattern"]
            }),
        },
        ToolDefinition {
            name: "code_insight".to_string(),
            description: "Codebase intelligence in compact LCF/1.0 text: health score and grade, complexity distribution, per-package coupling/cohesion/instability, module boundaries, and domain vocabulary. Start with mode=overview; drill in with mode=detailed analysis=modules or mode=statistics.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "mode": { "type": "string", "enum": ["overview", "detailed", "statistics", "unified", "structure", "git_analyze", "git_hotspots"], "description": "Analysis tier (git modes are not wired in this build)." },
                    "tier": { "type": "integer", "description": "Override the payload tier number (1-3)." },
                    "analysis": { "type": "string", "enum": ["modules", "layers", "features", "terms", "relationships"], "description": "Required for mode=detailed." },
                    "metrics": { "type": "array", "items": { "type": "string" }, "description": "For statistics: subset of complexity, coupling, cohesion, quality." },
                    "languages": { "type": "string", "description": "Comma extension filter (accepted; analysis currently spans all indexed languages)." },
                    "include": { "type": "array", "items": { "type": "string" }, "description": "Extra sections to request (extension point)." }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "semantic_annotations".to_string(),
            description: "Query symbols by inferred semantic label or domain category. Labels come from identifier vocabulary and propagate one hop along call edges at half strength.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "label": { "type": "string", "description": "Label term, e.g. 'auth'." },
                    "category": { "type": "string", "description": "Domain category, e.g. 'Authentication'." },
                    "min_strength": { "type": "number", "description": "Minimum label strength (default 0)." },
                    "include_direct": { "type": "boolean", "description": "Include directly matched labels (default true)." },
                    "include_propagated": { "type": "boolean", "description": "Include propagated labels (default true)." },
                    "max_results": { "type": "integer", "description": "Cap (default 50)." }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "side_effects".to_string(),
            description: "Purity analysis over the call graph: which symbols perform io, filesystem, network, global_state, time, or random effects. Effects propagate from callees to callers.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "mode": { "type": "string", "enum": ["symbol", "file", "pure", "impure", "category", "summary"], "description": "Query shape." },
                    "id": { "type": "string", "description": "Object ID for mode=symbol." },
                    "name": { "type": "string", "description": "Symbol name for mode=symbol." },
                    "path": { "type": "string", "description": "File path for mode=file." },
                    "category": { "type": "string", "description": "Effect category for mode=category." },
                    "max_results": { "type": "integer", "description": "Cap for list modes (default 50)." }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "info".to_string(),
            description: "Help for one tool (argument list + example) or an overview of all tools with best practices. Call this first when unsure.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tool": { "type": "string", "description": "Tool name to describe." }
                },
                "required": []
            }),
        },
    ]
}

/// Known argument keys per tool, for unknown-field warnings.
fn known_keys(tool: &str) -> &'static [&'static str] {
    match tool {
        "search" => &[
            "pattern", "patterns", "max", "output", "filter", "flags", "symbol_types",
            "max_per_file", "languages", "semantic", "include", "group", "page",
        ],
        "get_context" => &[
            "id", "name", "file_id", "mode", "include_sections", "exclude_sections",
            "max_depth", "include_ai_text", "confidence_threshold",
        ],
        "files" => &[
            "pattern", "max", "filter", "flags", "directory", "languages", "include_hidden",
        ],
        "code_insight" => &["mode", "tier", "analysis", "metrics", "languages", "include"],
        "semantic_annotations" => &[
            "label", "category", "min_strength", "include_direct", "include_propagated",
            "max_results",
        ],
        "side_effects" => &["mode", "id", "name", "path", "category", "max_results"],
        "info" => &["tool"],
        _ => &[],
    }
}

fn requires_index(tool: &str) -> bool {
    tool != "info"
}

// ─── Dispatch ───────────────────────────────────────────────────────

/// Dispatch a tool call to the right handler, then layer on warnings,
/// metrics, and the response size guard.
pub fn dispatch_tool(ctx: &HandlerContext, tool_name: &str, arguments: &Value) -> ToolCallResult {
    let dispatch_start = Instant::now();

    if let Ok(mut counters) = ctx.counters.lock() {
        counters.total += 1;
        *counters.per_tool.entry(tool_name.to_string()).or_insert(0) += 1;
    }

    // Index readiness gate: queries against a partial index would mislead.
    if requires_index(tool_name) {
        match ctx.indexer.state() {
            IndexingState::Completed => {}
            IndexingState::Failed => {
                let err = LciError::IndexUnavailable(
                    ctx.indexer
                        .error()
                        .unwrap_or_else(|| "indexing failed".to_string()),
                );
                return ToolCallResult::error(err.structured().to_string());
            }
            state => {
                return ToolCallResult::error(
                    json!({
                        "error": {
                            "kind": "index_not_ready",
                            "message": format!(
                                "Index is {}; retry in a few seconds or wait for completion.",
                                state.as_str()
                            ),
                            "state": state.as_str(),
                        }
                    })
                    .to_string(),
                );
            }
        }
    }

    let cancel: CancelToken = ctx.cancel.clone();
    let outcome: Result<ToolCallResult, LciError> = match tool_name {
        "search" => search::handle_search(ctx, arguments, &cancel),
        "get_context" => context::handle_get_context(ctx, arguments, &cancel),
        "files" => files::handle_files(ctx, arguments, &cancel),
        "code_insight" => insight::handle_code_insight(ctx, arguments, &cancel),
        "semantic_annotations" => annotations::handle_semantic_annotations(ctx, arguments, &cancel),
        "side_effects" => annotations::handle_side_effects(ctx, arguments, &cancel),
        "info" => Ok(handle_info(arguments)),
        _ => {
            return ToolCallResult::error(format!("Unknown tool: {}", tool_name));
        }
    };

    let result = match outcome {
        Ok(r) => r,
        Err(e) => {
            warn!(tool = %tool_name, error = %e, kind = e.kind(), "Tool call failed");
            return ToolCallResult::error(e.structured().to_string());
        }
    };

    let (warnings, mistakes) =
        utils::unknown_field_warnings(arguments, known_keys(tool_name), tool_name);
    let result = utils::inject_warnings(result, &warnings, &mistakes);

    let result = if ctx.metrics {
        utils::inject_metrics(result, ctx, dispatch_start)
    } else {
        result
    };
    utils::truncate_response_if_needed(result, ctx.max_response_bytes)
}

// ─── info handler ───────────────────────────────────────────────────

fn handle_info(args: &Value) -> ToolCallResult {
    let tool = args.get("tool").and_then(|v| v.as_str());
    let help = crate::tips::render_tool_json(tool);
    ToolCallResult::success(serde_json::to_string_pretty(&help).unwrap_or_default())
}

// ─── Tests ──────────────────────────────────────────────────────────
// The cross-tool handler suite lives in a sibling file to keep this module
// readable; it uses `use super::*` for access.

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

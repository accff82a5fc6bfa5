//! `search` handler: request normalization, expansion, orchestration,
//! shaping, pagination, and envelope assembly.

use serde_json::{json, Value};

use crate::cancel::CancelToken;
use crate::error::{CommonMistake, LciError};
use crate::index::SearchOptions;
use crate::mcp::protocol::ToolCallResult;
use crate::query::expand::expand_patterns;
use crate::query::flags::{parse_flags, SearchFlag};
use crate::query::paginate::{apply_pagination, group_results, GroupBy, PageRequest};
use crate::query::search::{run_search, RankedResult};
use crate::query::shape::{shape_result, CompactSearchResult, IncludeSet, OutputSize};
use crate::query::symbol_types::resolve_type_list;

use super::utils::{get_bool, get_str, get_str_list, get_usize};
use super::HandlerContext;

/// Default and hard caps on ranked results before shaping.
const DEFAULT_MAX_RESULTS: usize = 50;
const HARD_MAX_RESULTS: usize = 100;

/// Context lines captured per side, by output mode.
const CTX_DEFAULT_LINES: usize = 3;
const FULL_CONTEXT_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Shaped(OutputSize),
    Files,
    Count,
}

/// Parse the `output` argument: line | ctx | ctx:N | full | files | count.
fn parse_output(raw: Option<&str>) -> Result<(OutputFormat, usize), LciError> {
    let raw = raw.unwrap_or("ctx").trim().to_lowercase();
    if let Some(n) = raw.strip_prefix("ctx:") {
        let lines: usize = n.parse().map_err(|_| {
            LciError::validation(
                "output",
                "ctx:N requires a number of context lines",
                raw.clone(),
                "E_OUTPUT",
                vec![CommonMistake {
                    mistake: r#"{"output": "ctx:many"}"#.to_string(),
                    corrected: r#"{"output": "ctx:5"}"#.to_string(),
                }],
            )
        })?;
        return Ok((OutputFormat::Shaped(OutputSize::Context), lines.min(10)));
    }
    match raw.as_str() {
        "line" => Ok((OutputFormat::Shaped(OutputSize::Line), 0)),
        "ctx" => Ok((OutputFormat::Shaped(OutputSize::Context), CTX_DEFAULT_LINES)),
        "full" => Ok((OutputFormat::Shaped(OutputSize::Full), FULL_CONTEXT_LINES)),
        "files" => Ok((OutputFormat::Files, 0)),
        "count" => Ok((OutputFormat::Count, 0)),
        other => Err(LciError::validation(
            "output",
            "expected line, ctx, ctx:N, full, files, or count",
            other,
            "E_OUTPUT",
            vec![CommonMistake {
                mistake: format!(r#"{{"output": "{}"}}"#, other),
                corrected: r#"{"output": "ctx"}"#.to_string(),
            }],
        )),
    }
}

pub(super) fn handle_search(
    ctx: &HandlerContext,
    args: &Value,
    cancel: &CancelToken,
) -> Result<ToolCallResult, LciError> {
    let mut warnings: Vec<String> = Vec::new();

    // ─── Patterns ───────────────────────────────────────────
    let mut originals: Vec<String> = Vec::new();
    if let Some(p) = get_str(args, "pattern") {
        if !p.trim().is_empty() {
            originals.push(p.trim().to_string());
        }
    }
    for p in get_str_list(args, "patterns") {
        if !originals.contains(&p) {
            originals.push(p);
        }
    }
    if originals.is_empty() {
        return Err(LciError::validation(
            "pattern",
            "a pattern (or patterns list) is required",
            "",
            "E_NO_PATTERN",
            vec![CommonMistake {
                mistake: r#"{"max": 10}"#.to_string(),
                corrected: r#"{"pattern": "parse config", "max": 10}"#.to_string(),
            }],
        ));
    }

    // ─── Normalization (flags, types, output) ───────────────
    let flag_parse = parse_flags(&get_str(args, "flags").unwrap_or_default());
    warnings.extend(flag_parse.warnings.iter().cloned());

    let (symbol_kinds, type_warnings) =
        resolve_type_list(&get_str(args, "symbol_types").unwrap_or_default());
    warnings.extend(type_warnings);

    let (format, context_lines) = parse_output(get_str(args, "output").as_deref())?;
    let requested_size = match format {
        OutputFormat::Shaped(size) => size,
        _ => OutputSize::Line,
    };

    let (include, unknown_includes) = IncludeSet::parse(&get_str_list(args, "include"));
    for unknown in unknown_includes {
        warnings.push(format!(
            "unknown include option '{}'; valid: breadcrumbs, safety, refs, deps",
            unknown
        ));
    }

    let group = match get_str(args, "group") {
        Some(g) => match GroupBy::parse(&g) {
            Some(g) => Some(g),
            None => {
                warnings.push(format!(
                    "unknown group '{}' ignored; valid: file, symbol_type, directory",
                    g
                ));
                None
            }
        },
        None => None,
    };

    let mut options = SearchOptions {
        case_insensitive: flag_parse.has(SearchFlag::Ci),
        regex: flag_parse.has(SearchFlag::Rx),
        word_boundary: flag_parse.has(SearchFlag::Wb),
        invert: flag_parse.has(SearchFlag::Iv),
        exclude_tests: flag_parse.has(SearchFlag::Nt),
        exclude_comments: flag_parse.has(SearchFlag::Nc),
        symbol_kinds,
        max_per_file: get_usize(args, "max_per_file").unwrap_or(0),
        max_context: context_lines,
        ..Default::default()
    };
    if let Some(filter) = get_str(args, "filter") {
        if let Some(excluded) = filter.strip_prefix('!') {
            options.exclude_paths.push(excluded.to_string());
        } else {
            options.include_paths.push(filter);
        }
    }

    let languages: Vec<String> = get_str_list(args, "languages")
        .into_iter()
        .map(|l| l.trim_start_matches('.').to_lowercase())
        .collect();

    // Semantic expansion defaults on; only a literal `"semantic": false`
    // in the request turns it off.
    let semantic_on = get_bool(args, "semantic").unwrap_or(true);

    let max_results = get_usize(args, "max")
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, HARD_MAX_RESULTS);
    let page = get_usize(args, "page").unwrap_or(0);

    // ─── Expansion and orchestration ────────────────────────
    let index = ctx
        .index
        .read()
        .map_err(|e| LciError::internal(format!("index lock poisoned: {}", e)))?;

    let semantic_index = if semantic_on {
        Some(ctx.semantic.get_or_build(&index))
    } else {
        None
    };
    let expanded = expand_patterns(&originals, semantic_index.as_deref());

    let outcome = run_search(&index, &originals, &expanded, &options, cancel)?;

    let mut ranked: Vec<RankedResult> = outcome.ranked;
    if !languages.is_empty() {
        ranked.retain(|r| {
            r.result
                .path
                .rsplit_once('.')
                .is_some_and(|(_, ext)| languages.iter().any(|l| l.eq_ignore_ascii_case(ext)))
        });
    }

    let total_matches = ranked.len();
    let unique_files = {
        let mut files: Vec<&str> = ranked.iter().map(|r| r.result.path.as_str()).collect();
        files.sort_unstable();
        files.dedup();
        files.len()
    };

    // ─── Count / files shapes ───────────────────────────────
    match format {
        OutputFormat::Count => {
            let output = json!({
                "summary": {
                    "totalMatches": total_matches,
                    "uniqueFiles": unique_files,
                    "patterns": expanded,
                    "fallbackUsed": outcome.fallback_used,
                },
                "warnings": warnings,
            });
            return Ok(ToolCallResult::success(output.to_string()));
        }
        OutputFormat::Files => {
            let mut files: Vec<&str> = ranked.iter().map(|r| r.result.path.as_str()).collect();
            let mut seen = std::collections::HashSet::new();
            files.retain(|f| seen.insert(*f));
            files.truncate(max_results);
            let output = json!({
                "files": files,
                "total_matches": total_matches,
                "unique_files": unique_files,
                "warnings": warnings,
            });
            return Ok(ToolCallResult::success(output.to_string()));
        }
        OutputFormat::Shaped(_) => {}
    }

    // ─── Shaping, enrichment, pagination ────────────────────
    ranked.truncate(max_results);

    let shaped: Vec<CompactSearchResult> = ranked
        .iter()
        .map(|r| {
            let mut shaped = shape_result(r, requested_size, &include);
            enrich_from_index(&index, r, &mut shaped, &include);
            shaped
        })
        .collect();

    let page_request = PageRequest {
        size: requested_size,
        context_lines,
        symbol_filtered: !options.symbol_kinds.is_empty(),
        page,
    };
    let paginated = apply_pagination(shaped, &ctx.pagination, &page_request);

    let mut output = json!({
        "summary": {
            "totalMatches": total_matches,
            "uniqueFiles": unique_files,
            "returned": paginated.results.len(),
            "page": page,
            "pageSize": paginated.page_size,
            "hasMore": paginated.has_more,
            "patterns": expanded,
            "fallbackUsed": outcome.fallback_used,
            "patternsFailed": outcome.patterns_failed,
        },
        "warnings": warnings,
    });
    if let Some(next) = paginated.next_page {
        output["summary"]["nextPage"] = json!(next);
    }
    if let Some(suggested) = paginated.suggested_page_size {
        output["summary"]["suggestedPageSize"] = json!(suggested);
    }

    match group {
        Some(by) => {
            output["groups"] = group_results(&paginated.results, by);
        }
        None => {
            output["results"] = json!(paginated.results);
        }
    }

    Ok(ToolCallResult::success(output.to_string()))
}

/// Attach index-backed metadata the shaper cannot reach: the symbol kind,
/// and (when requested and the score clears the bar) safety and deps.
fn enrich_from_index(
    index: &crate::index::CodeIndex,
    ranked: &RankedResult,
    shaped: &mut CompactSearchResult,
    include: &IncludeSet,
) {
    let Some(ref oid) = shaped.object_id else {
        return;
    };
    let Some((ordinal, symbol)) = index.symbol_by_object_id(oid) else {
        return;
    };
    shaped.kind = Some(symbol.kind.as_str().to_string());

    if !crate::query::shape::metadata_allowed(ranked.boosted) {
        return;
    }
    if include.safety {
        shaped.safety = Some(
            index
                .annotations
                .effects(ordinal)
                .iter()
                .map(|e| e.as_str().to_string())
                .collect(),
        );
    }
    if include.deps {
        shaped.deps = Some(
            index
                .refs
                .outgoing(ordinal)
                .take(5)
                .filter_map(|e| index.symbols.get(e.target).map(|s| s.name.clone()))
                .collect(),
        );
    }
}

//! Adaptive paginator: computes page sizes from the token budget and the
//! estimator's per-result cost, then truncates responses to fit.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::query::shape::{CompactSearchResult, OutputSize};
use crate::query::tokens::{estimate_value, CONTEXT_LINE_TOKENS};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub default_max_tokens: usize,
    pub min_page_size: usize,
    pub max_page_size: usize,
    pub safety_margin: f64,
    pub smart_limit: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: 20_000,
            min_page_size: 5,
            max_page_size: 1000,
            safety_margin: 0.9,
            smart_limit: true,
        }
    }
}

/// The shape-relevant facts of one request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub size: OutputSize,
    pub context_lines: usize,
    pub symbol_filtered: bool,
    /// 0-based page index.
    pub page: usize,
}

/// Never return fewer than this many results when more exist, even if the
/// estimator claims they exceed budget — the estimator is allowed to
/// over-count, an empty page is never useful.
pub const MIN_RESULTS_GUARANTEE: usize = 3;

/// Metadata reserve subtracted from every budget.
const METADATA_RESERVE: usize = 100;

fn mode_budget(size: OutputSize) -> usize {
    match size {
        OutputSize::Full => 12_000,
        OutputSize::Line => 4_000,
        OutputSize::Context => 8_000,
    }
}

/// Predicted cost of one result when no sample is available.
fn base_result_cost(request: &PageRequest) -> usize {
    let line_cost = 50 + request.context_lines * CONTEXT_LINE_TOKENS;
    let sized = match request.size {
        OutputSize::Line => line_cost as f64,
        OutputSize::Context => line_cost as f64 * 1.5,
        OutputSize::Full => line_cost as f64 * 2.5,
    };
    let filtered = if request.symbol_filtered {
        sized * 1.3
    } else {
        sized
    };
    filtered.ceil() as usize
}

/// Compute the page size the token budget supports.
pub fn optimal_page_size(
    config: &PaginationConfig,
    request: &PageRequest,
    sample: Option<&Value>,
) -> usize {
    let budget = mode_budget(request.size);

    let tokens_per_result = sample
        .map(estimate_value)
        .filter(|&t| t > 0)
        .unwrap_or_else(|| base_result_cost(request))
        .max(1);

    let available =
        (budget as f64 * config.safety_margin) as usize - METADATA_RESERVE.min(budget);
    let preliminary = (available / tokens_per_result)
        .clamp(config.min_page_size, config.max_page_size);

    if config.smart_limit {
        let cap = if request.symbol_filtered { 20 } else { 10 };
        preliminary.min(cap)
    } else {
        preliminary
    }
}

// ─── Pagination ──────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Paginated {
    pub results: Vec<CompactSearchResult>,
    pub total: usize,
    pub page_size: usize,
    pub has_more: bool,
    pub next_page: Option<usize>,
    pub suggested_page_size: Option<usize>,
    /// True when the token budget, not the page size, cut the page short.
    pub token_truncated: bool,
}

/// Slice by computed page size, then truncate by tokens with the hard
/// minimum-of-three guarantee.
pub fn apply_pagination(
    all: Vec<CompactSearchResult>,
    config: &PaginationConfig,
    request: &PageRequest,
) -> Paginated {
    let total = all.len();

    let sample = all
        .first()
        .and_then(|r| serde_json::to_value(r).ok());
    let page_size = optimal_page_size(config, request, sample.as_ref());

    let start = (request.page * page_size).min(total);
    let end = (start + page_size).min(total);
    let slice = &all[start..end];

    let available = (mode_budget(request.size) as f64 * config.safety_margin) as usize
        - METADATA_RESERVE.min(mode_budget(request.size));

    let mut kept: Vec<CompactSearchResult> = Vec::new();
    let mut spent = 0usize;
    let mut token_truncated = false;
    for result in slice {
        let cost = serde_json::to_value(result)
            .map(|v| estimate_value(&v))
            .unwrap_or(0);
        if spent + cost > available && kept.len() >= MIN_RESULTS_GUARANTEE {
            token_truncated = true;
            break;
        }
        spent += cost;
        kept.push(result.clone());
    }

    let consumed = start + kept.len();
    let has_more = token_truncated || consumed < total;
    let suggested_page_size = kept.first().map(|first| {
        let first_value = serde_json::to_value(first).ok();
        optimal_page_size(config, request, first_value.as_ref())
    });

    Paginated {
        results: kept,
        total,
        page_size,
        has_more,
        next_page: has_more.then_some(request.page + 1),
        suggested_page_size,
        token_truncated,
    }
}

// ─── Grouping ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    File,
    SymbolType,
    Directory,
}

impl GroupBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Some(Self::File),
            "symbol_type" | "symboltype" | "type" | "kind" => Some(Self::SymbolType),
            "directory" | "dir" => Some(Self::Directory),
            _ => None,
        }
    }

    fn key_for(&self, result: &CompactSearchResult) -> String {
        match self {
            Self::File => result.path.clone(),
            Self::SymbolType => result
                .kind
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            Self::Directory => result
                .path
                .rsplit_once('/')
                .map(|(dir, _)| dir.to_string())
                .unwrap_or_else(|| ".".to_string()),
        }
    }
}

/// Group results: `{group_name: {count, results}}`, groups sorted by name
/// for deterministic output.
pub fn group_results(results: &[CompactSearchResult], by: GroupBy) -> Value {
    let mut groups: BTreeMap<String, Vec<&CompactSearchResult>> = BTreeMap::new();
    for result in results {
        groups.entry(by.key_for(result)).or_default().push(result);
    }

    let mut out = serde_json::Map::new();
    for (name, members) in groups {
        out.insert(
            name,
            json!({
                "count": members.len(),
                "results": members,
            }),
        );
    }
    Value::Object(out)
}

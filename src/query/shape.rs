//! Result shaper: score-proportional truncation of match text and context.
//!
//! High-scoring results keep the caller's requested detail level; weaker
//! ones are squeezed down so the token budget is spent where relevance is.

use serde::Serialize;

use crate::index::refs::RefStats;
use crate::query::search::RankedResult;

// ─── Output sizing ───────────────────────────────────────────────────

/// Requested detail level, ordered so downgrading is `pred()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputSize {
    Line,
    Context,
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Context => "ctx",
            Self::Full => "full",
        }
    }

    fn downgrade(self) -> Self {
        match self {
            Self::Full => Self::Context,
            Self::Context | Self::Line => Self::Line,
        }
    }

    /// Match-text truncation cap in bytes.
    pub fn match_cap(&self) -> usize {
        match self {
            Self::Line => 100,
            Self::Context => 300,
            Self::Full => 500,
        }
    }

    /// Maximum number of context lines.
    pub fn context_line_cap(&self) -> usize {
        match self {
            Self::Line => 0,
            Self::Context => 10,
            Self::Full => 30,
        }
    }
}

/// Byte budget for full-mode context blocks.
const FULL_CONTEXT_BYTE_CAP: usize = 2048;

const ELLIPSIS: &str = "…";

/// Scores above 1.0 are on the raw 0–100 scale; normalize before
/// thresholding.
pub fn normalized_score(raw: f64) -> f64 {
    if raw > 1.0 {
        raw / 100.0
    } else {
        raw
    }
}

/// The detail level actually applied: strong results keep the request,
/// middling ones lose a step, weak ones always collapse to line.
pub fn effective_size(requested: OutputSize, score: f64) -> OutputSize {
    let normalized = normalized_score(score);
    if normalized >= 0.8 {
        requested
    } else if normalized >= 0.5 {
        requested.downgrade()
    } else {
        OutputSize::Line
    }
}

/// Optional metadata is only worth tokens on results the caller will
/// actually read.
pub fn metadata_allowed(score: f64) -> bool {
    normalized_score(score) >= 0.5
}

// ─── Include set ─────────────────────────────────────────────────────

/// Relational metadata the caller can opt into.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeSet {
    pub breadcrumbs: bool,
    pub safety: bool,
    pub refs: bool,
    pub deps: bool,
}

impl IncludeSet {
    /// Parse from a string list. Unknown entries are reported back for the
    /// warnings channel instead of failing.
    pub fn parse(entries: &[String]) -> (Self, Vec<String>) {
        let mut set = Self::default();
        let mut unknown = Vec::new();
        for entry in entries {
            match entry.trim().to_lowercase().as_str() {
                "breadcrumbs" => set.breadcrumbs = true,
                "safety" => set.safety = true,
                "refs" => set.refs = true,
                "deps" => set.deps = true,
                "" => {}
                other => unknown.push(other.to_string()),
            }
        }
        (set, unknown)
    }
}

// ─── Truncation ──────────────────────────────────────────────────────

/// Truncate text to `cap` bytes: whole lines first, then within a single
/// line at the nearest word boundary past half the cap, with an ellipsis.
pub fn truncate_text(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }

    // Line boundaries first.
    if text.contains('\n') {
        let budget = cap.saturating_sub(ELLIPSIS.len());
        let mut kept = String::new();
        for line in text.lines() {
            let addition = line.len() + usize::from(!kept.is_empty());
            if kept.len() + addition > budget {
                break;
            }
            if !kept.is_empty() {
                kept.push('\n');
            }
            kept.push_str(line);
        }
        if !kept.is_empty() {
            kept.push_str(ELLIPSIS);
            return kept;
        }
        // First line alone exceeds the cap: fall through to word split.
    }

    let line = text.lines().next().unwrap_or(text);
    let budget = cap.saturating_sub(ELLIPSIS.len());
    let half = cap / 2;

    // Nearest word boundary greater than half the cap.
    let mut cut = None;
    for (i, c) in line.char_indices() {
        if i > budget {
            break;
        }
        if c.is_whitespace() && i > half {
            cut = Some(i);
            break;
        }
    }
    let cut = cut.unwrap_or_else(|| {
        // No usable boundary: hard cut at the last char boundary in budget.
        line.char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= budget)
            .last()
            .unwrap_or(0)
    });

    let mut out = line[..cut].to_string();
    out.push_str(ELLIPSIS);
    out
}

/// Shape a context block for the given size: line count cap, and for full
/// mode a total byte cap that stops at a line boundary.
pub fn shape_context(lines: &[String], size: OutputSize) -> Vec<String> {
    let line_cap = size.context_line_cap();
    if line_cap == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut bytes = 0usize;
    for line in lines.iter().take(line_cap) {
        if size == OutputSize::Full && bytes + line.len() > FULL_CONTEXT_BYTE_CAP {
            break;
        }
        bytes += line.len();
        out.push(line.clone());
    }
    out
}

// ─── Compact result ──────────────────────────────────────────────────

/// The shaped, token-budgeted result form delivered to clients.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompactSearchResult {
    pub path: String,
    pub line: u32,
    pub column: u32,
    #[serde(rename = "match")]
    pub matched: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breadcrumbs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refs: Option<RefStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deps: Option<Vec<String>>,
    /// Number of distinct patterns that matched this location.
    pub coverage: usize,
}

/// Shape one ranked result. Safety/deps enrichment happens in the handler
/// (it needs index access); this applies sizing, truncation, and the
/// score-gated breadcrumbs/refs metadata.
pub fn shape_result(
    ranked: &RankedResult,
    requested: OutputSize,
    include: &IncludeSet,
) -> CompactSearchResult {
    let size = effective_size(requested, ranked.boosted);
    let matched = truncate_text(&ranked.result.matched, size.match_cap());
    let context = shape_context(&ranked.result.context, size);

    let allow_meta = metadata_allowed(ranked.boosted);
    let breadcrumbs = if allow_meta && include.breadcrumbs {
        ranked.result.breadcrumbs.clone()
    } else {
        None
    };
    let refs = if allow_meta && include.refs {
        ranked.result.ref_stats
    } else {
        None
    };

    CompactSearchResult {
        path: ranked.result.path.clone(),
        line: ranked.result.line,
        column: ranked.result.column,
        matched,
        score: (ranked.boosted * 10000.0).round() / 10000.0,
        object_id: ranked.result.object_id.clone(),
        kind: None,
        context,
        breadcrumbs,
        refs,
        safety: None,
        deps: None,
        coverage: ranked.coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DetailedResult;

    fn ranked(score: f64, matched: &str, context_lines: usize) -> RankedResult {
        RankedResult {
            result: DetailedResult {
                file_id: 0,
                path: "src/a.rs".to_string(),
                line: 1,
                column: 1,
                matched: matched.to_string(),
                score,
                context: (0..context_lines).map(|i| format!("ctx {}", i)).collect(),
                object_id: None,
                breadcrumbs: Some(vec!["src".to_string(), "a".to_string()]),
                ref_stats: Some(RefStats {
                    incoming: 1,
                    outgoing: 2,
                }),
            },
            coverage: 1,
            boosted: score,
            from_fallback: false,
        }
    }

    #[test]
    fn test_effective_size_thresholds() {
        assert_eq!(effective_size(OutputSize::Full, 0.8), OutputSize::Full);
        assert_eq!(effective_size(OutputSize::Full, 0.79), OutputSize::Context);
        assert_eq!(effective_size(OutputSize::Full, 0.49), OutputSize::Line);
        assert_eq!(effective_size(OutputSize::Context, 0.6), OutputSize::Line);
        assert_eq!(effective_size(OutputSize::Line, 0.6), OutputSize::Line);
    }

    #[test]
    fn test_raw_scores_normalize_by_100() {
        assert_eq!(effective_size(OutputSize::Full, 80.0), OutputSize::Full);
        assert_eq!(effective_size(OutputSize::Full, 79.0), OutputSize::Context);
        assert_eq!(effective_size(OutputSize::Full, 49.0), OutputSize::Line);
    }

    #[test]
    fn test_low_score_gets_line_and_no_context() {
        let r = ranked(0.4, "short match", 8);
        let shaped = shape_result(&r, OutputSize::Full, &IncludeSet::default());
        assert!(shaped.context.is_empty());
        assert!(shaped.matched.len() <= 100);
    }

    #[test]
    fn test_match_caps_by_size() {
        let long = "word ".repeat(200);
        let high = ranked(0.95, &long, 0);
        let full = shape_result(&high, OutputSize::Full, &IncludeSet::default());
        assert!(full.matched.len() <= 500);

        let ctx = shape_result(&high, OutputSize::Context, &IncludeSet::default());
        assert!(ctx.matched.len() <= 300);

        let line = shape_result(&high, OutputSize::Line, &IncludeSet::default());
        assert!(line.matched.len() <= 100);
    }

    #[test]
    fn test_truncate_at_word_boundary_past_half_cap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi omicron pi rho sigma tau";
        let out = truncate_text(text, 60);
        assert!(out.ends_with(ELLIPSIS));
        let body = out.trim_end_matches(ELLIPSIS);
        assert!(body.len() > 30, "cut before half the cap: {}", body.len());
        assert!(body.len() <= 60);
        // Cut lands on a word boundary.
        assert!(text.as_bytes()[body.len()] == b' ');
    }

    #[test]
    fn test_truncate_prefers_line_boundaries() {
        let text = "first line\nsecond line\nthird line that is quite long";
        let out = truncate_text(text, 25);
        assert_eq!(out, format!("first line\nsecond line{}", ELLIPSIS));
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_text("short", 100), "short");
    }

    #[test]
    fn test_context_line_caps() {
        let lines: Vec<String> = (0..50).map(|i| format!("line {}", i)).collect();
        assert!(shape_context(&lines, OutputSize::Line).is_empty());
        assert_eq!(shape_context(&lines, OutputSize::Context).len(), 10);
        assert_eq!(shape_context(&lines, OutputSize::Full).len(), 30);
    }

    #[test]
    fn test_full_context_byte_cap_stops_at_line_boundary() {
        let lines: Vec<String> = (0..30).map(|_| "x".repeat(200)).collect();
        let shaped = shape_context(&lines, OutputSize::Full);
        let total: usize = shaped.iter().map(String::len).sum();
        assert!(total <= FULL_CONTEXT_BYTE_CAP);
        assert_eq!(shaped.len(), 10); // 10 × 200 = 2000 ≤ 2048, 11 would exceed
    }

    #[test]
    fn test_metadata_gated_by_score_and_include() {
        let include = IncludeSet {
            breadcrumbs: true,
            refs: true,
            ..Default::default()
        };
        let strong = shape_result(&ranked(0.9, "m", 0), OutputSize::Line, &include);
        assert!(strong.breadcrumbs.is_some());
        assert!(strong.refs.is_some());

        let weak = shape_result(&ranked(0.4, "m", 0), OutputSize::Line, &include);
        assert!(weak.breadcrumbs.is_none());
        assert!(weak.refs.is_none());

        let not_asked = shape_result(&ranked(0.9, "m", 0), OutputSize::Line, &IncludeSet::default());
        assert!(not_asked.breadcrumbs.is_none());
        assert!(not_asked.refs.is_none());
    }

    #[test]
    fn test_include_set_parse_reports_unknown() {
        let (set, unknown) = IncludeSet::parse(&[
            "breadcrumbs".to_string(),
            "refs".to_string(),
            "telemetry".to_string(),
        ]);
        assert!(set.breadcrumbs);
        assert!(set.refs);
        assert!(!set.safety);
        assert_eq!(unknown, vec!["telemetry".to_string()]);
    }
}

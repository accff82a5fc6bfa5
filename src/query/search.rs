//! Search engine orchestrator: runs expanded patterns against the index,
//! deduplicates by result identity, applies the word-coverage boost, runs
//! the regex fallback pass, and heap-ranks into a deterministic order.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::warn;

use crate::cancel::CancelToken;
use crate::error::LciError;
use crate::index::{CodeIndex, DetailedResult, ResultKey, SearchOptions};
use crate::query::patterns::looks_like_regex;

/// Per-pattern coverage boost step and its cap (+50%).
const COVERAGE_STEP: f64 = 0.15;
const COVERAGE_CAP: f64 = 0.50;

/// Score multiplier for results found only by the regex fallback pass.
const FALLBACK_FACTOR: f64 = 0.5;

/// A deduplicated result with its boosted score.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub result: DetailedResult,
    /// Number of distinct patterns that matched this location.
    pub coverage: usize,
    /// Base score × coverage boost (or × 0.5 for fallback-only results).
    pub boosted: f64,
    pub from_fallback: bool,
}

#[derive(Debug)]
pub struct SearchOutcome {
    /// Fully ordered: (boosted desc, match length desc, path asc).
    pub ranked: Vec<RankedResult>,
    pub patterns_run: usize,
    pub patterns_failed: usize,
    pub fallback_used: bool,
}

/// Apply the word-coverage boost for `k` distinct matching patterns.
pub fn coverage_boost(base: f64, k: usize) -> f64 {
    let bonus = ((k.saturating_sub(1)) as f64 * COVERAGE_STEP).min(COVERAGE_CAP);
    base * (1.0 + bonus)
}

// ─── Heap ordering ───────────────────────────────────────────────────

struct HeapEntry {
    boosted: f64,
    match_len: usize,
    path: String,
    line: u32,
    column: u32,
    slot: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    /// Max-heap order: higher score first, longer match text breaks ties,
    /// lexicographically smaller path breaks remaining ties. This comparator
    /// IS the determinism contract; pagination and clients rely on it.
    /// Line and column settle matches that tie on all three, so runs never
    /// inherit hash-map iteration order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.boosted
            .total_cmp(&other.boosted)
            .then_with(|| self.match_len.cmp(&other.match_len))
            .then_with(|| other.path.cmp(&self.path))
            .then_with(|| other.line.cmp(&self.line))
            .then_with(|| other.column.cmp(&self.column))
    }
}

// ─── Orchestration ───────────────────────────────────────────────────

struct MergeEntry {
    result: DetailedResult,
    coverage: usize,
}

/// Run every expanded pattern, merge by `ResultKey`, boost, fall back, rank.
///
/// `originals` are the caller's raw patterns (pre-expansion) — only they can
/// trigger the regex fallback. Per-pattern failures are logged and skipped;
/// the search fails only when every pattern fails.
pub fn run_search(
    index: &CodeIndex,
    originals: &[String],
    expanded: &[String],
    options: &SearchOptions,
    cancel: &CancelToken,
) -> Result<SearchOutcome, LciError> {
    let mut merged: HashMap<ResultKey, MergeEntry> = HashMap::new();
    let mut failed = 0usize;
    let mut last_error: Option<LciError> = None;

    for pattern in expanded {
        cancel.check()?;
        let hits = match index.detailed_search(pattern, options, cancel) {
            Ok(h) => h,
            Err(e @ LciError::Cancelled) => return Err(e),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Pattern search failed, skipping");
                failed += 1;
                last_error = Some(e);
                continue;
            }
        };

        // Coverage counts distinct patterns, so dedup hits within one pass.
        let mut seen: HashSet<ResultKey> = HashSet::new();
        for hit in hits {
            let key = hit.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            match merged.entry(key) {
                Entry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    entry.coverage += 1;
                    if hit.score > entry.result.score {
                        entry.result = hit;
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(MergeEntry {
                        result: hit,
                        coverage: 1,
                    });
                }
            }
        }
    }

    if !expanded.is_empty() && failed == expanded.len() {
        return Err(last_error.unwrap_or_else(|| LciError::internal("all patterns failed")));
    }

    let mut ranked: Vec<RankedResult> = merged
        .into_values()
        .map(|entry| RankedResult {
            boosted: coverage_boost(entry.result.score, entry.coverage),
            coverage: entry.coverage,
            result: entry.result,
            from_fallback: false,
        })
        .collect();

    // Regex fallback: one extra pass when the caller did not ask for regex
    // but an original pattern is shaped like one. Fallback hits score at
    // half weight and never displace a primary hit.
    let mut fallback_used = false;
    if !options.regex {
        let primary_keys: HashSet<ResultKey> =
            ranked.iter().map(|r| r.result.key()).collect();
        let fallback_options = SearchOptions {
            regex: true,
            ..options.clone()
        };
        for pattern in originals.iter().filter(|p| looks_like_regex(p)) {
            cancel.check()?;
            fallback_used = true;
            let hits = match index.detailed_search(pattern, &fallback_options, cancel) {
                Ok(h) => h,
                Err(e @ LciError::Cancelled) => return Err(e),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Regex fallback failed, skipping");
                    continue;
                }
            };
            for hit in hits {
                let key = hit.key();
                if primary_keys.contains(&key) {
                    continue;
                }
                if ranked
                    .iter()
                    .any(|r| r.from_fallback && r.result.key() == key)
                {
                    continue;
                }
                let mut result = hit;
                result.score *= FALLBACK_FACTOR;
                ranked.push(RankedResult {
                    boosted: result.score,
                    coverage: 1,
                    result,
                    from_fallback: true,
                });
            }
        }
    }

    // Heap-rank into the total order.
    let mut heap: BinaryHeap<HeapEntry> = ranked
        .iter()
        .enumerate()
        .map(|(slot, r)| HeapEntry {
            boosted: r.boosted,
            match_len: r.result.matched.chars().count(),
            path: r.result.path.clone(),
            line: r.result.line,
            column: r.result.column,
            slot,
        })
        .collect();

    let mut order = Vec::with_capacity(ranked.len());
    while let Some(entry) = heap.pop() {
        order.push(entry.slot);
    }

    let mut slots: Vec<Option<RankedResult>> = ranked.into_iter().map(Some).collect();
    let ordered: Vec<RankedResult> = order
        .into_iter()
        .map(|slot| slots[slot].take().expect("each slot pops once"))
        .collect();

    Ok(SearchOutcome {
        ranked: ordered,
        patterns_run: expanded.len(),
        patterns_failed: failed,
        fallback_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::symbols::{EnhancedSymbol, SymbolKind};

    fn index_with_lines(files: &[(&str, &str)]) -> CodeIndex {
        let mut idx = CodeIndex::empty(".");
        idx.generation = 1;
        for (path, content) in files {
            let file_id = idx.files.add(path.to_string(), content);
            let lines = idx.files.lines(file_id).to_vec();
            for (i, text) in lines.iter().enumerate() {
                idx.trigrams.add_line(file_id, i as u32 + 1, text);
            }
        }
        idx
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_coverage_boost_seed_values() {
        assert!((coverage_boost(100.0, 3) - 130.0).abs() < 0.01);
        assert!((coverage_boost(100.0, 5) - 150.0).abs() < 0.01);
        assert!((coverage_boost(100.0, 10) - 150.0).abs() < 0.01);
        assert!((coverage_boost(100.0, 1) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_dedup_no_duplicate_keys_in_outcome() {
        let idx = index_with_lines(&[(
            "src/a.rs",
            "user_service builds the user_service index\n",
        )]);
        let expanded = strings(&["user_service", "user", "service"]);
        let outcome = run_search(
            &idx,
            &strings(&["user_service"]),
            &expanded,
            &SearchOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();

        let mut keys = HashSet::new();
        for r in &outcome.ranked {
            assert!(keys.insert(r.result.key()), "duplicate key in response");
        }
    }

    #[test]
    fn test_multi_pattern_coverage_raises_score() {
        let idx = index_with_lines(&[
            ("src/both.rs", "fn user_handler() {}\n"),
            ("src/single.rs", "fn user_only() {}\n"),
        ]);
        // "user" matches both files; "handler" only the first.
        let expanded = strings(&["user", "handler"]);
        let outcome = run_search(
            &idx,
            &strings(&["user handler"]),
            &expanded,
            &SearchOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();

        let both = outcome
            .ranked
            .iter()
            .find(|r| r.result.path == "src/both.rs" && r.coverage == 2)
            .expect("covered result");
        assert!((both.boosted - coverage_boost(both.result.score, 2)).abs() < 1e-9);

        let single = outcome
            .ranked
            .iter()
            .find(|r| r.result.path == "src/single.rs")
            .unwrap();
        assert!(both.boosted > single.boosted);
    }

    #[test]
    fn test_ordering_is_non_increasing() {
        let idx = index_with_lines(&[
            ("src/a.rs", "alpha beta alpha\nbeta alpha\nalpha\n"),
            ("src/b.rs", "alpha\nbeta\n"),
        ]);
        let expanded = strings(&["alpha", "beta"]);
        let outcome = run_search(
            &idx,
            &strings(&["alpha beta"]),
            &expanded,
            &SearchOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();

        for pair in outcome.ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let a_key = (
                a.boosted,
                a.result.matched.chars().count(),
            );
            let b_key = (
                b.boosted,
                b.result.matched.chars().count(),
            );
            assert!(
                a_key > b_key
                    || (a.boosted == b.boosted
                        && a.result.matched.chars().count() == b.result.matched.chars().count()
                        && a.result.path <= b.result.path),
                "order violated: {:?} before {:?}",
                a_key,
                b_key
            );
        }
    }

    #[test]
    fn test_ordering_is_deterministic_across_runs() {
        let idx = index_with_lines(&[
            ("src/z.rs", "needle\n"),
            ("src/a.rs", "needle\n"),
            ("src/m.rs", "needle\n"),
        ]);
        let expanded = strings(&["needle"]);
        let run = || {
            run_search(
                &idx,
                &strings(&["needle"]),
                &expanded,
                &SearchOptions::default(),
                &CancelToken::new(),
            )
            .unwrap()
            .ranked
            .iter()
            .map(|r| r.result.path.clone())
            .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        // Equal scores and match lengths: path ascending.
        assert_eq!(first, vec!["src/a.rs", "src/m.rs", "src/z.rs"]);
    }

    #[test]
    fn test_full_ties_order_by_line() {
        // Same path, same match text, same score: line number decides.
        let idx = index_with_lines(&[("src/a.rs", "needle\nneedle\nneedle\n")]);
        let patterns = strings(&["needle"]);
        let outcome = run_search(
            &idx,
            &patterns,
            &patterns,
            &SearchOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();
        let lines: Vec<u32> = outcome.ranked.iter().map(|r| r.result.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_regex_fallback_halves_scores() {
        let idx = index_with_lines(&[("src/cache.rs", "struct IUserCache {}\nstruct IDataCache {}\n")]);
        // Not a literal hit anywhere, but regex-shaped.
        let originals = strings(&["I[A-Z]\\w*Cache"]);
        let outcome = run_search(
            &idx,
            &originals,
            &originals,
            &SearchOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert!(outcome.fallback_used);
        assert!(!outcome.ranked.is_empty());
        for r in &outcome.ranked {
            assert!(r.from_fallback);
            // Raw regex hits score 0.8; the fallback halves them.
            assert!(r.boosted <= 0.8 * FALLBACK_FACTOR + 1e-9);
        }
    }

    #[test]
    fn test_fallback_never_displaces_primary() {
        let idx = index_with_lines(&[("src/a.rs", "get.value here\n")]);
        // Literal "get.value" hits line 1; as regex `.` also matches.
        let originals = strings(&["get.value"]);
        let outcome = run_search(
            &idx,
            &originals,
            &originals,
            &SearchOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();

        // "get.value" contains ".v" but no regex metas per the classifier,
        // so no fallback should even run.
        assert!(!outcome.fallback_used);
        assert!(outcome.ranked.iter().all(|r| !r.from_fallback));
    }

    #[test]
    fn test_all_patterns_failing_fails_query() {
        let idx = index_with_lines(&[("src/a.rs", "text\n")]);
        let options = SearchOptions {
            regex: true,
            ..Default::default()
        };
        let bad = strings(&["[unclosed", "(also bad"]);
        let err = run_search(&idx, &bad, &bad, &options, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, LciError::InvalidRegex { .. }));
    }

    #[test]
    fn test_partial_pattern_failure_is_survivable() {
        let idx = index_with_lines(&[("src/a.rs", "real_token here\n")]);
        let options = SearchOptions {
            regex: true,
            ..Default::default()
        };
        let mixed = strings(&["[unclosed", "real_token"]);
        let outcome = run_search(&idx, &mixed, &mixed, &options, &CancelToken::new()).unwrap();
        assert_eq!(outcome.patterns_failed, 1);
        assert!(!outcome.ranked.is_empty());
    }

    #[test]
    fn test_cancellation_collapses_query() {
        let idx = index_with_lines(&[("src/a.rs", "token\n")]);
        let token = CancelToken::new();
        token.cancel();
        let patterns = strings(&["token"]);
        let err = run_search(
            &idx,
            &patterns,
            &patterns,
            &SearchOptions::default(),
            &token,
        )
        .unwrap_err();
        assert!(matches!(err, LciError::Cancelled));
    }

    #[test]
    fn test_higher_base_score_copy_wins_dedup() {
        let mut idx = index_with_lines(&[("src/a.rs", "fn exact_name() {}\n")]);
        let file_id = 0;
        idx.symbols.insert(EnhancedSymbol {
            name: "exact_name".to_string(),
            kind: SymbolKind::Function,
            file_id,
            line: 1,
            column: 4,
            signature: None,
            exported: false,
            complexity: 1,
        });
        // Symbol-kind search scores exact name 1.0; both patterns hit the
        // same (file, line, match) so one entry must remain with the max.
        let options = SearchOptions {
            symbol_kinds: vec![SymbolKind::Function],
            ..Default::default()
        };
        let expanded = strings(&["exact_name", "exact"]);
        let outcome = run_search(
            &idx,
            &strings(&["exact_name"]),
            &expanded,
            &options,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(outcome.ranked.len(), 1);
        assert_eq!(outcome.ranked[0].coverage, 2);
        assert!((outcome.ranked[0].result.score - 1.0).abs() < 1e-9);
    }
}

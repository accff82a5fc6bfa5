//! In-memory index aggregate and its search interface.
//!
//! The stores (symbols, trigrams, references, file content, annotations) are
//! collaborators of the query engine: the engine only consumes the lookup
//! surface defined here, so a richer indexer can replace the scanner without
//! touching the pipeline.

pub mod annotations;
pub mod files;
pub mod refs;
pub mod scan;
pub mod symbols;
pub mod trigram;

use std::collections::HashMap;

use regex::RegexBuilder;

use crate::cancel::CancelToken;
use crate::error::LciError;

use self::annotations::AnnotationStore;
use self::files::FileStore;
use self::refs::{RefStats, ReferenceTracker};
use self::symbols::{FileId, SymbolKind, SymbolOrdinal, SymbolStore};
use self::trigram::TrigramStore;

// ─── Search interface types ──────────────────────────────────────────

/// Options for one detailed-search pass against the index.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub case_insensitive: bool,
    pub regex: bool,
    pub word_boundary: bool,
    pub invert: bool,
    pub exclude_tests: bool,
    pub exclude_comments: bool,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub symbol_kinds: Vec<SymbolKind>,
    /// 0 = unlimited.
    pub max_per_file: usize,
    /// Context lines captured on each side of a match.
    pub max_context: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            regex: false,
            word_boundary: false,
            invert: false,
            exclude_tests: false,
            exclude_comments: false,
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            symbol_kinds: Vec::new(),
            max_per_file: 0,
            max_context: 2,
        }
    }
}

/// Identity of a match for deduplication: two results with the same key
/// refer to the same physical code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub file_id: FileId,
    pub line: u32,
    pub matched: String,
}

/// One raw search hit. Mutated only during scoring passes inside a single
/// query; never shared across queries.
#[derive(Debug, Clone)]
pub struct DetailedResult {
    pub file_id: FileId,
    pub path: String,
    /// 1-based line of the match.
    pub line: u32,
    /// 1-based column of the match start.
    pub column: u32,
    pub matched: String,
    pub score: f64,
    pub context: Vec<String>,
    pub object_id: Option<String>,
    pub breadcrumbs: Option<Vec<String>>,
    pub ref_stats: Option<RefStats>,
}

impl DetailedResult {
    pub fn key(&self) -> ResultKey {
        ResultKey {
            file_id: self.file_id,
            line: self.line,
            matched: self.matched.clone(),
        }
    }
}

// ─── Path helpers ────────────────────────────────────────────────────

/// Language-specific test markers: a path matching any of these is treated
/// as test code by the `nt` flag and by cohesion reporting.
const TEST_MARKERS: &[&str] = &["_test.", ".test.", ".spec.", "/tests/", "/test/", "/__tests__/"];

pub fn is_test_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    let file_name = lower.rsplit('/').next().unwrap_or(&lower);
    TEST_MARKERS.iter().any(|m| lower.contains(m))
        || file_name.starts_with("test_")
        || file_name
            .rsplit_once('.')
            .is_some_and(|(stem, _)| stem.ends_with("test") || stem.ends_with("tests"))
}

/// Comment-line heuristic shared by the `nc` flag.
pub fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("/*")
        || trimmed.starts_with("* ")
        || trimmed.starts_with("--")
}

/// Match a path against a filter pattern: plain substring, or a `*` glob
/// when the pattern contains one.
pub fn path_matches(path: &str, pattern: &str) -> bool {
    let path_lower = path.to_lowercase();
    let pat_lower = pattern.to_lowercase();
    if !pat_lower.contains('*') {
        return path_lower.contains(&pat_lower);
    }
    let parts: Vec<&str> = pat_lower.split('*').collect();
    let mut pos = 0usize;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match path_lower[pos..].find(part) {
            Some(found) => {
                // A leading literal must anchor at the start of the path.
                if i == 0 && found != 0 {
                    return false;
                }
                pos += found + part.len();
            }
            None => return false,
        }
    }
    // A trailing literal must anchor at the end.
    if let Some(last) = parts.last()
        && !last.is_empty()
        && !path_lower.ends_with(last)
    {
        return false;
    }
    true
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when the slice `[start, end)` of `line` sits on word boundaries.
fn on_word_boundary(line: &str, start: usize, end: usize) -> bool {
    let before_ok = start == 0
        || line[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_word_char(c));
    let after_ok = end >= line.len()
        || line[end..].chars().next().is_none_or(|c| !is_word_char(c));
    before_ok && after_ok
}

// ─── Code Index ──────────────────────────────────────────────────────

/// The shared in-memory index. Generation 0 is the empty placeholder
/// published before auto-indexing completes; every full re-index replaces
/// the whole value and bumps the generation.
#[derive(Debug)]
pub struct CodeIndex {
    pub root: String,
    pub generation: u64,
    pub files: FileStore,
    pub symbols: SymbolStore,
    pub trigrams: TrigramStore,
    pub refs: ReferenceTracker,
    pub annotations: AnnotationStore,
}

/// Per-pattern result cap: keeps one degenerate pattern (for example a
/// single letter under invert) from flooding the merge map.
const MAX_HITS_PER_PATTERN: usize = 2000;

impl CodeIndex {
    pub fn empty(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            generation: 0,
            files: FileStore::default(),
            symbols: SymbolStore::default(),
            trigrams: TrigramStore::default(),
            refs: ReferenceTracker::default(),
            annotations: AnnotationStore::default(),
        }
    }

    /// True once a real generation has been published.
    pub fn is_ready(&self) -> bool {
        self.generation > 0
    }

    /// Resolve a wire object ID to its symbol.
    pub fn symbol_by_object_id(
        &self,
        id: &str,
    ) -> Option<(SymbolOrdinal, &symbols::EnhancedSymbol)> {
        let ordinal = lci::decode_object_id(id)?;
        self.symbols.get(ordinal).map(|s| (ordinal, s))
    }

    fn file_passes(&self, path: &str, options: &SearchOptions) -> bool {
        if options.exclude_tests && is_test_path(path) {
            return false;
        }
        if !options.include_paths.is_empty()
            && !options.include_paths.iter().any(|p| path_matches(path, p))
        {
            return false;
        }
        if options.exclude_paths.iter().any(|p| path_matches(path, p)) {
            return false;
        }
        true
    }

    /// One detailed search pass for a single pattern.
    ///
    /// Symbol-kind filtered requests search symbol names; everything else is
    /// a content search over indexed lines (trigram-accelerated for literal
    /// patterns of three or more characters).
    pub fn detailed_search(
        &self,
        pattern: &str,
        options: &SearchOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<DetailedResult>, LciError> {
        cancel.check()?;
        if pattern.is_empty() {
            return Ok(Vec::new());
        }

        if !options.symbol_kinds.is_empty() {
            self.symbol_search(pattern, options)
        } else {
            self.content_search(pattern, options, cancel)
        }
    }

    // ─── Symbol-name search ─────────────────────────────────

    fn symbol_search(
        &self,
        pattern: &str,
        options: &SearchOptions,
    ) -> Result<Vec<DetailedResult>, LciError> {
        let regex = if options.regex {
            Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(options.case_insensitive)
                    .build()
                    .map_err(|e| LciError::InvalidRegex {
                        pattern: pattern.to_string(),
                        source: e,
                    })?,
            )
        } else {
            None
        };
        let needle = if options.case_insensitive {
            pattern.to_lowercase()
        } else {
            pattern.to_string()
        };

        let mut out = Vec::new();
        let mut per_file: HashMap<FileId, usize> = HashMap::new();

        for (ordinal, symbol) in self.symbols.iter() {
            if !options.symbol_kinds.contains(&symbol.kind) {
                continue;
            }
            let Some(path) = self.files.path(symbol.file_id) else {
                continue;
            };
            if !self.file_passes(path, options) {
                continue;
            }

            let name_cmp = if options.case_insensitive {
                symbol.name.to_lowercase()
            } else {
                symbol.name.clone()
            };

            let score = if let Some(ref re) = regex {
                if re.is_match(&symbol.name) { 0.9 } else { continue }
            } else if name_cmp == needle {
                1.0
            } else if options.word_boundary {
                // Whole-name matches only under wb.
                continue;
            } else if name_cmp.starts_with(&needle) {
                0.85
            } else if name_cmp.contains(&needle) {
                0.6 + 0.2 * (needle.len() as f64 / name_cmp.len() as f64)
            } else {
                continue;
            };

            if options.max_per_file > 0 {
                let count = per_file.entry(symbol.file_id).or_insert(0);
                if *count >= options.max_per_file {
                    continue;
                }
                *count += 1;
            }

            out.push(self.make_result(
                symbol.file_id,
                symbol.line,
                symbol.column,
                symbol.name.clone(),
                score,
                options,
                Some(ordinal),
            ));
            if out.len() >= MAX_HITS_PER_PATTERN {
                break;
            }
        }
        Ok(out)
    }

    // ─── Content search ─────────────────────────────────────

    fn content_search(
        &self,
        pattern: &str,
        options: &SearchOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<DetailedResult>, LciError> {
        let regex = if options.regex {
            Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(options.case_insensitive)
                    .build()
                    .map_err(|e| LciError::InvalidRegex {
                        pattern: pattern.to_string(),
                        source: e,
                    })?,
            )
        } else {
            None
        };

        // Trigram acceleration is only sound for plain literal lookups.
        let use_trigrams =
            regex.is_none() && !options.invert && pattern.chars().count() >= 3;

        let mut out = Vec::new();
        let mut per_file: HashMap<FileId, usize> = HashMap::new();

        let consider = |idx: &Self,
                            file_id: FileId,
                            line_no: u32,
                            out: &mut Vec<DetailedResult>,
                            per_file: &mut HashMap<FileId, usize>|
         -> bool {
            let Some(path) = idx.files.path(file_id) else {
                return true;
            };
            if !idx.file_passes(path, options) {
                return true;
            }
            let Some(text) = idx.files.line(file_id, line_no) else {
                return true;
            };
            if options.exclude_comments && is_comment_line(text) {
                return true;
            }

            let hit = idx.match_line(text, pattern, regex.as_ref(), options);
            let hit = if options.invert {
                match hit {
                    // An inverted match carries the whole line at a flat score.
                    Some(_) => None,
                    None => Some((0, text.len(), 0.3)),
                }
            } else {
                hit
            };
            let Some((start, end, score)) = hit else {
                return true;
            };

            if options.max_per_file > 0 {
                let count = per_file.entry(file_id).or_insert(0);
                if *count >= options.max_per_file {
                    return true;
                }
                *count += 1;
            }

            // Offsets computed on a lowercased copy can fall off char
            // boundaries for non-ASCII text; fall back to the whole line.
            let matched = text
                .get(start..end.min(text.len()))
                .unwrap_or(text)
                .to_string();
            let ordinal = idx
                .symbols
                .in_file(file_id)
                .iter()
                .find(|&&o| idx.symbols.get(o).is_some_and(|s| s.line == line_no))
                .copied();
            out.push(idx.make_result(
                file_id,
                line_no,
                start as u32 + 1,
                matched,
                score,
                options,
                ordinal,
            ));
            out.len() < MAX_HITS_PER_PATTERN
        };

        if use_trigrams
            && let Some(candidates) = self.trigrams.candidates(pattern)
        {
            for cand in candidates {
                cancel.check()?;
                if !consider(self, cand.file_id, cand.line, &mut out, &mut per_file) {
                    break;
                }
            }
            return Ok(out);
        }

        'files: for file_id in 0..self.files.len() as FileId {
            cancel.check()?;
            for line_no in 1..=self.files.lines(file_id).len() as u32 {
                if !consider(self, file_id, line_no, &mut out, &mut per_file) {
                    break 'files;
                }
            }
        }
        Ok(out)
    }

    /// Match one line; returns (byte start, byte end, base score).
    fn match_line(
        &self,
        text: &str,
        pattern: &str,
        regex: Option<&regex::Regex>,
        options: &SearchOptions,
    ) -> Option<(usize, usize, f64)> {
        if let Some(re) = regex {
            let m = re.find(text)?;
            if options.word_boundary && !on_word_boundary(text, m.start(), m.end()) {
                return None;
            }
            return Some((m.start(), m.end(), 0.8));
        }

        let (haystack, needle) = if options.case_insensitive {
            (text.to_lowercase(), pattern.to_lowercase())
        } else {
            (text.to_string(), pattern.to_string())
        };
        let start = haystack.find(&needle)?;
        let end = start + needle.len();
        if options.word_boundary && !on_word_boundary(&haystack, start, end) {
            return None;
        }
        // Whole-token hits outrank substring hits.
        let score = if on_word_boundary(&haystack, start, end) {
            0.9
        } else {
            0.7
        };
        Some((start, end, score))
    }

    fn make_result(
        &self,
        file_id: FileId,
        line: u32,
        column: u32,
        matched: String,
        score: f64,
        options: &SearchOptions,
        ordinal: Option<SymbolOrdinal>,
    ) -> DetailedResult {
        let path = self.files.path(file_id).unwrap_or("").to_string();
        let context = if options.max_context > 0 {
            self.files
                .context(file_id, line, options.max_context, options.max_context)
        } else {
            Vec::new()
        };

        let (object_id, breadcrumbs, ref_stats) = match ordinal {
            Some(ord) => {
                let mut crumbs: Vec<String> = path
                    .rsplit_once('/')
                    .map(|(dir, _)| dir.split('/').map(str::to_string).collect())
                    .unwrap_or_default();
                if let Some(sym) = self.symbols.get(ord) {
                    crumbs.push(sym.name.clone());
                }
                (
                    Some(self.symbols.object_id(ord)),
                    Some(crumbs),
                    Some(self.refs.stats(ord)),
                )
            }
            None => (None, None, None),
        };

        DetailedResult {
            file_id,
            path,
            line,
            column,
            matched,
            score,
            context,
            object_id,
            breadcrumbs,
            ref_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::symbols::EnhancedSymbol;

    fn test_index() -> CodeIndex {
        let mut idx = CodeIndex::empty(".");
        idx.generation = 1;

        let f0 = idx.files.add(
            "src/user_service.rs".to_string(),
            "pub fn create_user(name: &str) {\n    let id = next_id();\n    store_user(id, name);\n}\n// helper comment about create_user\n",
        );
        let f1 = idx.files.add(
            "tests/user_test.rs".to_string(),
            "fn test_create_user() {\n    create_user(\"bob\");\n}\n",
        );

        for (file_id, lines) in [(f0, idx.files.lines(f0).to_vec()), (f1, idx.files.lines(f1).to_vec())] {
            for (i, text) in lines.iter().enumerate() {
                idx.trigrams.add_line(file_id, i as u32 + 1, text);
            }
        }

        idx.symbols.insert(EnhancedSymbol {
            name: "create_user".to_string(),
            kind: SymbolKind::Function,
            file_id: f0,
            line: 1,
            column: 8,
            signature: Some("pub fn create_user(name: &str)".to_string()),
            exported: true,
            complexity: 1,
        });
        idx
    }

    #[test]
    fn test_literal_search_finds_all_locations() {
        let idx = test_index();
        let results = idx
            .detailed_search("create_user", &SearchOptions::default(), &CancelToken::new())
            .unwrap();
        assert!(results.len() >= 3);
        assert!(results.iter().any(|r| r.path == "src/user_service.rs"));
        assert!(results.iter().any(|r| r.path == "tests/user_test.rs"));
    }

    #[test]
    fn test_exclude_tests_filters_test_files() {
        let idx = test_index();
        let options = SearchOptions {
            exclude_tests: true,
            ..Default::default()
        };
        let results = idx
            .detailed_search("create_user", &options, &CancelToken::new())
            .unwrap();
        assert!(results.iter().all(|r| !r.path.contains("test")));
        assert!(!results.is_empty());
    }

    #[test]
    fn test_exclude_comments_filters_comment_lines() {
        let idx = test_index();
        let options = SearchOptions {
            exclude_comments: true,
            ..Default::default()
        };
        let results = idx
            .detailed_search("create_user", &options, &CancelToken::new())
            .unwrap();
        assert!(results.iter().all(|r| r.line != 5 || r.file_id != 0));
    }

    #[test]
    fn test_symbol_kind_search_attaches_object_id() {
        let idx = test_index();
        let options = SearchOptions {
            symbol_kinds: vec![SymbolKind::Function],
            case_insensitive: true,
            ..Default::default()
        };
        let results = idx
            .detailed_search("CREATE_USER", &options, &CancelToken::new())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].object_id.as_deref(), Some("A"));
        assert!(results[0].breadcrumbs.as_ref().unwrap().contains(&"create_user".to_string()));
    }

    #[test]
    fn test_regex_search() {
        let idx = test_index();
        let options = SearchOptions {
            regex: true,
            ..Default::default()
        };
        let results = idx
            .detailed_search(r"create_\w+", &options, &CancelToken::new())
            .unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| (r.score - 0.8).abs() < 1e-9));
    }

    #[test]
    fn test_invalid_regex_is_structured_error() {
        let idx = test_index();
        let options = SearchOptions {
            regex: true,
            ..Default::default()
        };
        let err = idx
            .detailed_search("[oops", &options, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, LciError::InvalidRegex { .. }));
    }

    #[test]
    fn test_word_boundary_rejects_partial_token() {
        let idx = test_index();
        let options = SearchOptions {
            word_boundary: true,
            ..Default::default()
        };
        let results = idx
            .detailed_search("create_use", &options, &CancelToken::new())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let idx = test_index();
        let token = CancelToken::new();
        token.cancel();
        let err = idx
            .detailed_search("create_user", &SearchOptions::default(), &token)
            .unwrap_err();
        assert!(matches!(err, LciError::Cancelled));
    }

    #[test]
    fn test_max_per_file_caps_hits() {
        let idx = test_index();
        let options = SearchOptions {
            max_per_file: 1,
            ..Default::default()
        };
        let results = idx
            .detailed_search("user", &options, &CancelToken::new())
            .unwrap();
        let mut seen = std::collections::HashMap::new();
        for r in &results {
            *seen.entry(r.file_id).or_insert(0usize) += 1;
        }
        assert!(seen.values().all(|&c| c <= 1));
    }

    #[test]
    fn test_path_matches_glob() {
        assert!(path_matches("src/query/search.rs", "src/*"));
        assert!(path_matches("src/query/search.rs", "*.rs"));
        assert!(path_matches("src/query/search.rs", "query"));
        assert!(!path_matches("src/query/search.rs", "*.go"));
        assert!(!path_matches("lib/query.rs", "src/*"));
    }

    #[test]
    fn test_is_test_path_markers() {
        assert!(is_test_path("tests/foo.rs"));
        assert!(is_test_path("src/foo_test.go"));
        assert!(is_test_path("src/foo.test.ts"));
        assert!(is_test_path("src/FooTests.cs"));
        assert!(!is_test_path("src/contest.rs"));
        assert!(!is_test_path("src/user_service.rs"));
    }

    #[test]
    fn test_result_key_identity() {
        let idx = test_index();
        let results = idx
            .detailed_search("create_user", &SearchOptions::default(), &CancelToken::new())
            .unwrap();
        let k1 = results[0].key();
        let k2 = results[0].key();
        assert_eq!(k1, k2);
    }
}

//! File-path search: fuzzy, multi-term matching over the indexed path table.

use lci::levenshtein;

use crate::index::path_matches;

/// Default and hard caps on returned paths.
pub const DEFAULT_MAX_FILES: usize = 50;
pub const HARD_MAX_FILES: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct FileSearchOptions {
    /// 0 means `DEFAULT_MAX_FILES`; anything above the hard cap is clamped.
    pub max: usize,
    /// Extension filter, lowercased without dots.
    pub languages: Vec<String>,
    /// Substring-or-glob path filter.
    pub filter: Option<String>,
    /// Restrict to paths under this directory.
    pub directory: Option<String>,
    pub include_hidden: bool,
}

#[derive(Debug, Clone)]
pub struct FileMatch {
    pub path: String,
    pub score: f64,
    /// Distinct patterns that matched.
    pub matched_patterns: usize,
}

/// Expand a raw pattern with the word-split rule: the original first, then
/// whitespace-split words longer than 2 characters.
pub fn expand_file_patterns(pattern: &str) -> Vec<String> {
    let mut out = Vec::new();
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return out;
    }
    out.push(trimmed.to_string());
    if trimmed.contains(char::is_whitespace) {
        for word in trimmed.split_whitespace() {
            if word.chars().count() > 2 && !out.iter().any(|p| p == word) {
                out.push(word.to_string());
            }
        }
    }
    out
}

/// Hidden check: any path component starting with `.` (except `.` / `..`).
fn is_hidden(path: &str) -> bool {
    path.split('/')
        .any(|c| c.starts_with('.') && c != "." && c != "..")
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

/// Best-match score for one pattern against one path. The ladder is ordered
/// strongest to weakest; the first rung that fires wins.
pub fn score_path(path: &str, pattern: &str) -> f64 {
    let path_lower = path.to_lowercase();
    let pat_lower = pattern.to_lowercase();
    let name = file_name(&path_lower);
    let stem = file_stem(name);

    if path_lower == pat_lower {
        return 1.0;
    }
    if name == pat_lower {
        return 0.95;
    }
    if stem == pat_lower {
        return 0.93;
    }
    if let Some(pos) = path_lower.find(&pat_lower) {
        // Later hits are weaker: up to −0.2 by relative start position.
        let penalty = 0.2 * (pos as f64 / path_lower.len().max(1) as f64);
        return 0.8 - penalty;
    }
    // Fuzzy on the filename without extension.
    let dist = levenshtein(stem, &pat_lower);
    let max_len = stem.chars().count().max(pat_lower.chars().count()).max(1);
    let similarity = 1.0 - dist as f64 / max_len as f64;
    if similarity >= 0.6 {
        return 0.7 * similarity;
    }
    // Any path component containing the pattern.
    if path_lower.split('/').any(|c| c.contains(&pat_lower)) {
        return 0.6;
    }
    0.0
}

/// Search the path table with multi-pattern expansion and coverage boost.
pub fn search_paths(
    paths: &[String],
    pattern: &str,
    options: &FileSearchOptions,
) -> Vec<FileMatch> {
    let patterns = expand_file_patterns(pattern);
    if patterns.is_empty() {
        return Vec::new();
    }

    let max = if options.max == 0 {
        DEFAULT_MAX_FILES
    } else {
        options.max.min(HARD_MAX_FILES)
    };

    let mut matches: Vec<FileMatch> = Vec::new();
    for path in paths {
        if !options.include_hidden && is_hidden(path) {
            continue;
        }
        if let Some(ref dir) = options.directory {
            let dir_norm = dir.trim_end_matches('/');
            let under = path
                .to_lowercase()
                .starts_with(&format!("{}/", dir_norm.to_lowercase()));
            if !under {
                continue;
            }
        }
        if let Some(ref filter) = options.filter
            && !path_matches(path, filter)
        {
            continue;
        }
        if !options.languages.is_empty() {
            let ext = path
                .rsplit_once('.')
                .map(|(_, e)| e.to_lowercase())
                .unwrap_or_default();
            if !options.languages.iter().any(|l| *l == ext) {
                continue;
            }
        }

        let mut best = 0.0f64;
        let mut matched = 0usize;
        for p in &patterns {
            let score = score_path(path, p);
            if score > 0.0 {
                matched += 1;
                best = best.max(score);
            }
        }
        if matched == 0 {
            continue;
        }

        let boost = 1.0 + ((matched.saturating_sub(1)) as f64 * 0.15).min(0.50);
        let score = (best * boost).min(1.0);
        matches.push(FileMatch {
            path: path.clone(),
            score,
            matched_patterns: matched,
        });
    }

    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.path.cmp(&b.path))
    });
    matches.truncate(max);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_score_ladder_priorities() {
        assert_eq!(score_path("src/user.rs", "src/user.rs"), 1.0);
        assert_eq!(score_path("src/user.rs", "user.rs"), 0.95);
        assert_eq!(score_path("src/user.rs", "user"), 0.93);
    }

    #[test]
    fn test_substring_earlier_scores_higher() {
        let early = score_path("abcdef/target.rs", "abc");
        let late = score_path("target/abcdef.rs", "abc");
        assert!(early > late, "early {} late {}", early, late);
    }

    #[test]
    fn test_fuzzy_on_stem() {
        let score = score_path("src/user_handler.go", "user handler");
        assert!(score > 0.6 && score < 0.7, "fuzzy score {}", score);
    }

    #[test]
    fn test_no_match_scores_zero() {
        assert_eq!(score_path("src/user.rs", "zzz_nothing"), 0.0);
    }

    #[test]
    fn test_expand_word_split() {
        let out = expand_file_patterns("user handler");
        assert_eq!(out, vec!["user handler", "user", "handler"]);
    }

    #[test]
    fn test_multi_term_outscores_single_term() {
        let table = paths(&["src/user_handler.go"]);
        let multi = search_paths(&table, "user handler", &FileSearchOptions::default());
        let single = search_paths(&table, "user", &FileSearchOptions::default());
        assert!(
            multi[0].score > single[0].score,
            "multi {} should beat single {}",
            multi[0].score,
            single[0].score
        );
        assert_eq!(multi[0].matched_patterns, 3);
    }

    #[test]
    fn test_boost_capped_at_one() {
        let table = paths(&["user/user_user_user.rs"]);
        let out = search_paths(&table, "user user_user_user.rs user_user_user", &FileSearchOptions::default());
        assert!(out[0].score <= 1.0);
    }

    #[test]
    fn test_sorted_descending_with_path_tiebreak() {
        let table = paths(&["b/item.rs", "a/item.rs", "exact_item.rs"]);
        let out = search_paths(&table, "item", &FileSearchOptions::default());
        for pair in out.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].path < pair[1].path)
            );
        }
    }

    #[test]
    fn test_hidden_files_excluded_by_default() {
        let table = paths(&[".git/config_user.rs", "src/config_user.rs"]);
        let out = search_paths(&table, "config_user", &FileSearchOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "src/config_user.rs");

        let with_hidden = search_paths(
            &table,
            "config_user",
            &FileSearchOptions {
                include_hidden: true,
                ..Default::default()
            },
        );
        assert_eq!(with_hidden.len(), 2);
    }

    #[test]
    fn test_language_filter() {
        let table = paths(&["src/user.rs", "src/user.go", "src/user.py"]);
        let out = search_paths(
            &table,
            "user",
            &FileSearchOptions {
                languages: vec!["go".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(out.len(), 1);
        assert!(out[0].path.ends_with(".go"));
    }

    #[test]
    fn test_directory_restriction() {
        let table = paths(&["src/user.rs", "vendor/user.rs"]);
        let out = search_paths(
            &table,
            "user",
            &FileSearchOptions {
                directory: Some("src".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "src/user.rs");
    }

    #[test]
    fn test_glob_filter() {
        let table = paths(&["src/user.rs", "src/user_test.rs"]);
        let out = search_paths(
            &table,
            "user",
            &FileSearchOptions {
                filter: Some("*_test.rs".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "src/user_test.rs");
    }

    #[test]
    fn test_max_caps_results() {
        let table: Vec<String> = (0..300).map(|i| format!("src/m{}/item.rs", i)).collect();
        let out = search_paths(&table, "item", &FileSearchOptions::default());
        assert_eq!(out.len(), DEFAULT_MAX_FILES);

        let out = search_paths(
            &table,
            "item",
            &FileSearchOptions {
                max: 500,
                ..Default::default()
            },
        );
        assert_eq!(out.len(), HARD_MAX_FILES);
    }
}

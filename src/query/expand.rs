//! Semantic expander: turns raw patterns into an ordered, deduplicated
//! expansion list with the original pattern always first.

use crate::semantic::SemanticIndex;

/// Expand raw patterns. Rules, in order:
/// 1. the original pattern itself (score-priority invariant: element 0),
/// 2. whitespace-split words longer than 2 characters,
/// 3. semantic candidate variants when a semantic index is supplied.
///
/// Deduplication preserves first-seen order.
pub fn expand_patterns(patterns: &[String], semantic: Option<&SemanticIndex>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        if !candidate.is_empty() && !out.iter().any(|p| p == candidate) {
            out.push(candidate.to_string());
        }
    };

    for pattern in patterns {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            continue;
        }
        push(pattern);

        if pattern.contains(char::is_whitespace) {
            for word in pattern.split_whitespace() {
                if word.chars().count() > 2 {
                    push(word);
                }
            }
        }

        if let Some(index) = semantic {
            for variant in index.variants(pattern) {
                push(&variant);
            }
        }
    }

    out
}

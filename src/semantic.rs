//! Semantic candidate index: fuzzy, stem, abbreviation, camelCase-split and
//! substring variants for query expansion.
//!
//! Built lazily from the symbol vocabulary on first use, then read-only for
//! the rest of the index generation.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use lci::{levenshtein, split_identifier};

use crate::index::CodeIndex;

/// Caps keep expansion from drowning the original pattern.
const MAX_FUZZY_VARIANTS: usize = 5;
const MAX_SUBSTRING_VARIANTS: usize = 5;
const MAX_INITIALISM_VARIANTS: usize = 3;

/// Two-way abbreviation vocabulary common in code bases.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("cfg", "config"),
    ("ctx", "context"),
    ("db", "database"),
    ("auth", "authentication"),
    ("init", "initialize"),
    ("msg", "message"),
    ("req", "request"),
    ("res", "response"),
    ("resp", "response"),
    ("err", "error"),
    ("svc", "service"),
    ("mgr", "manager"),
    ("util", "utility"),
    ("repo", "repository"),
    ("conn", "connection"),
    ("idx", "index"),
    ("num", "number"),
    ("str", "string"),
    ("val", "value"),
    ("obj", "object"),
    ("param", "parameter"),
    ("arg", "argument"),
    ("calc", "calculate"),
    ("gen", "generate"),
    ("exec", "execute"),
    ("proc", "process"),
    ("dir", "directory"),
    ("impl", "implementation"),
];

/// Suffixes stripped to form stem variants.
const STEM_SUFFIXES: &[&str] = &["ings", "ing", "ed", "es", "s", "tion", "er"];

/// Read-only per-generation candidate index.
#[derive(Debug)]
pub struct SemanticIndex {
    /// Lowercased identifier words from the symbol store, sorted for
    /// deterministic iteration.
    words: Vec<String>,
    /// Lowercased full symbol names with their split words, for initialism
    /// matching (`gus` → `get_user_service`).
    names: Vec<(String, Vec<String>)>,
}

impl SemanticIndex {
    pub fn build(index: &CodeIndex) -> Self {
        let mut words: BTreeSet<String> = BTreeSet::new();
        let mut names: Vec<(String, Vec<String>)> = Vec::new();
        let mut seen_names: BTreeSet<String> = BTreeSet::new();

        for (_, symbol) in index.symbols.iter() {
            let lower = symbol.name.to_lowercase();
            let parts = split_identifier(&symbol.name);
            for w in &parts {
                if w.len() > 2 {
                    words.insert(w.clone());
                }
            }
            if parts.len() >= 2 && seen_names.insert(lower.clone()) {
                names.push((lower, parts));
            }
        }

        Self {
            words: words.into_iter().collect(),
            names,
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.words.len()
    }

    /// All expansion variants for one pattern, original excluded.
    /// Order is deterministic: camel splits, stems, abbreviations,
    /// initialisms, fuzzy, substrings.
    pub fn variants(&self, pattern: &str) -> Vec<String> {
        let lower = pattern.to_lowercase();
        let mut out: Vec<String> = Vec::new();
        let mut push = |candidate: String| {
            if candidate != lower && candidate.len() > 2 && !out.contains(&candidate) {
                out.push(candidate);
            }
        };

        // camelCase / snake_case splits of the pattern itself
        let parts = split_identifier(pattern);
        if parts.len() >= 2 {
            for part in &parts {
                push(part.clone());
            }
        }

        // stems
        for suffix in STEM_SUFFIXES {
            if let Some(stem) = lower.strip_suffix(suffix)
                && stem.len() > 2
            {
                push(stem.to_string());
                break; // longest-suffix stem only
            }
        }

        // abbreviation table, both directions
        for (abbr, expansion) in ABBREVIATIONS {
            if lower == *abbr {
                push((*expansion).to_string());
            } else if lower == *expansion {
                push((*abbr).to_string());
            }
        }

        // initialisms against multi-word symbol names
        if lower.len() >= 2 && lower.chars().all(|c| c.is_ascii_alphabetic()) {
            let initials: Vec<char> = lower.chars().collect();
            let mut found = 0;
            for (name, words) in &self.names {
                if words.len() == initials.len()
                    && words
                        .iter()
                        .zip(&initials)
                        .all(|(w, &i)| w.starts_with(i))
                {
                    push(name.clone());
                    found += 1;
                    if found >= MAX_INITIALISM_VARIANTS {
                        break;
                    }
                }
            }
        }

        // fuzzy vocabulary neighbors
        if lower.len() >= 4 {
            let mut found = 0;
            for word in &self.words {
                if word.len().abs_diff(lower.len()) <= 2 && levenshtein(word, &lower) <= 2 {
                    push(word.clone());
                    found += 1;
                    if found >= MAX_FUZZY_VARIANTS {
                        break;
                    }
                }
            }
        }

        // vocabulary words containing the pattern
        if lower.len() >= 3 {
            let mut found = 0;
            for word in &self.words {
                if word.contains(&lower) && word != &lower {
                    push(word.clone());
                    found += 1;
                    if found >= MAX_SUBSTRING_VARIANTS {
                        break;
                    }
                }
            }
        }

        out
    }
}

// ─── Per-generation cache ────────────────────────────────────────────

/// Lazily initializes the semantic index once per generation. The mutex
/// guards construction so racing first callers never build it twice.
#[derive(Debug, Default)]
pub struct SemanticCache {
    slot: Mutex<Option<(u64, Arc<SemanticIndex>)>>,
}

impl SemanticCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&self, index: &CodeIndex) -> Arc<SemanticIndex> {
        let mut slot = self.slot.lock().expect("semantic cache lock");
        if let Some((generation, ref cached)) = *slot
            && generation == index.generation
        {
            return Arc::clone(cached);
        }
        let built = Arc::new(SemanticIndex::build(index));
        *slot = Some((index.generation, Arc::clone(&built)));
        built
    }
}

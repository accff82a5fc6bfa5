//! Domain vocabulary: classifies symbol names into functional domains and
//! scores a confidence per domain for the whole codebase.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::index::CodeIndex;

/// One domain and the identifier words that signal it.
pub struct DomainDef {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// The fixed domain table. Words are matched against split identifier words
/// exactly (weight 1.0) or by prefix (weight 0.6).
pub const DOMAINS: &[DomainDef] = &[
    DomainDef {
        name: "Authentication",
        keywords: &[
            "auth", "login", "logout", "password", "token", "session", "credential", "oauth",
            "jwt", "permission", "role", "hash",
        ],
    },
    DomainDef {
        name: "Database",
        keywords: &[
            "db", "database", "query", "sql", "table", "transaction", "migration", "schema",
            "record", "store", "repository", "row",
        ],
    },
    DomainDef {
        name: "HTTP/API",
        keywords: &[
            "http", "request", "response", "endpoint", "route", "handler", "api", "rest", "url",
            "middleware", "status",
        ],
    },
    DomainDef {
        name: "Parsing",
        keywords: &[
            "parse", "parser", "lexer", "ast", "syntax", "grammar", "decode", "deserialize",
            "tokenize",
        ],
    },
    DomainDef {
        name: "Testing",
        keywords: &["test", "mock", "fixture", "assert", "spec", "stub", "fake", "harness"],
    },
    DomainDef {
        name: "Indexing",
        keywords: &[
            "index", "search", "trigram", "posting", "rank", "score", "lookup", "query",
        ],
    },
    DomainDef {
        name: "Configuration",
        keywords: &[
            "config", "setting", "option", "flag", "env", "parameter", "default", "profile",
        ],
    },
    DomainDef {
        name: "Error Handling",
        keywords: &[
            "error", "err", "exception", "panic", "fail", "failure", "recover", "retry",
            "fallback", "warn",
        ],
    },
    DomainDef {
        name: "Concurrency",
        keywords: &[
            "thread", "mutex", "lock", "async", "await", "spawn", "channel", "atomic", "worker",
            "pool",
        ],
    },
];

const EXACT_WEIGHT: f32 = 1.0;
const PREFIX_WEIGHT: f32 = 0.6;

/// One keyword hit for one symbol.
#[derive(Debug, Clone)]
pub struct WordHit {
    pub domain: &'static str,
    pub term: String,
    pub weight: f32,
}

/// Classify one identifier's words against the domain table.
pub fn classify_words(words: &[String]) -> Vec<WordHit> {
    let mut hits = Vec::new();
    for domain in DOMAINS {
        for word in words {
            for keyword in domain.keywords {
                if word == keyword {
                    hits.push(WordHit {
                        domain: domain.name,
                        term: (*keyword).to_string(),
                        weight: EXACT_WEIGHT,
                    });
                } else if word.len() > keyword.len() && word.starts_with(keyword) {
                    hits.push(WordHit {
                        domain: domain.name,
                        term: (*keyword).to_string(),
                        weight: PREFIX_WEIGHT,
                    });
                }
            }
        }
    }
    hits
}

/// Aggregate domain classification for the indexed vocabulary.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DomainTerm {
    pub domain: String,
    pub terms: Vec<String>,
    /// Confidence in [0.1, 1.0].
    pub confidence: f64,
    /// Total keyword hits across all symbols.
    pub count: usize,
}

/// Blend weights for the domain confidence score.
const W_STRENGTH: f64 = 0.40;
const W_TERMS: f64 = 0.25;
const W_FREQUENCY: f64 = 0.20;
const W_SPECIFICITY: f64 = 0.15;

/// Compute the domain vocabulary for the whole index, strongest first.
pub fn domain_vocabulary(index: &CodeIndex) -> Vec<DomainTerm> {
    struct Acc {
        terms: BTreeSet<String>,
        total_hits: usize,
        strength_sum: f64,
    }
    let mut acc: BTreeMap<&'static str, Acc> = BTreeMap::new();

    for (_, symbol) in index.symbols.iter() {
        let words = lci::split_identifier(&symbol.name);
        for hit in classify_words(&words) {
            let entry = acc.entry(hit.domain).or_insert_with(|| Acc {
                terms: BTreeSet::new(),
                total_hits: 0,
                strength_sum: 0.0,
            });
            entry.terms.insert(hit.term);
            entry.total_hits += 1;
            entry.strength_sum += hit.weight as f64;
        }
    }

    let mut out: Vec<DomainTerm> = acc
        .into_iter()
        .map(|(name, a)| {
            let strength = a.strength_sum / a.total_hits.max(1) as f64;
            let term_count = a.terms.len();
            let total_keywords = DOMAINS
                .iter()
                .find(|d| d.name == name)
                .map(|d| d.keywords.len())
                .unwrap_or(1);

            let term_score = ((term_count + 1) as f64).log10().min(1.0);
            let freq_score = (((a.total_hits + 1) as f64).log10() / 2.0).min(1.0);
            let specificity = (10.0 * term_count as f64 / total_keywords as f64).min(1.0);

            let confidence = (W_STRENGTH * strength
                + W_TERMS * term_score
                + W_FREQUENCY * freq_score
                + W_SPECIFICITY * specificity)
                .clamp(0.1, 1.0);

            DomainTerm {
                domain: name.to_string(),
                terms: a.terms.into_iter().collect(),
                confidence: (confidence * 100.0).round() / 100.0,
                count: a.total_hits,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.domain.cmp(&b.domain))
    });
    out
}

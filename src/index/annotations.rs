//! Semantic annotation and purity stores.
//!
//! Labels are inferred from symbol-name vocabulary at scan time; side-effect
//! categories come from name/signature heuristics and propagate along call
//! edges so callers of impure functions read as impure.

use std::collections::HashMap;

use serde::Serialize;

use super::refs::{RefKind, ReferenceTracker};
use super::symbols::SymbolOrdinal;

// ─── Semantic labels ─────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone)]
pub struct SemanticLabel {
    pub label: String,
    pub category: String,
    /// Match strength in [0, 1].
    pub strength: f32,
    /// True when inherited from a callee rather than matched directly.
    pub propagated: bool,
}

// ─── Side-effect categories ──────────────────────────────────────────

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectCategory {
    Io,
    Filesystem,
    Network,
    GlobalState,
    Time,
    Random,
}

impl EffectCategory {
    pub const ALL: [EffectCategory; 6] = [
        Self::Io,
        Self::Filesystem,
        Self::Network,
        Self::GlobalState,
        Self::Time,
        Self::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Filesystem => "filesystem",
            Self::Network => "network",
            Self::GlobalState => "global_state",
            Self::Time => "time",
            Self::Random => "random",
        }
    }
}

impl std::str::FromStr for EffectCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        EffectCategory::ALL
            .iter()
            .find(|c| c.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("Unknown effect category: '{}'", s))
    }
}

/// Effect vocabulary: (category, words matched against split identifier words).
const EFFECT_VOCAB: &[(EffectCategory, &[&str])] = &[
    (
        EffectCategory::Io,
        &["print", "println", "write", "writer", "read", "reader", "log", "emit", "flush", "stdout", "stderr", "stdin"],
    ),
    (
        EffectCategory::Filesystem,
        &["file", "path", "dir", "directory", "fs", "open", "create", "remove", "delete", "mkdir", "walk"],
    ),
    (
        EffectCategory::Network,
        &["http", "socket", "request", "fetch", "url", "tcp", "udp", "send", "recv", "download", "upload", "client", "server"],
    ),
    (
        EffectCategory::GlobalState,
        &["global", "static", "env", "setenv", "singleton", "registry", "cache"],
    ),
    (
        EffectCategory::Time,
        &["now", "time", "clock", "sleep", "timer", "timestamp", "elapsed"],
    ),
    (
        EffectCategory::Random,
        &["rand", "random", "shuffle", "uuid", "nonce"],
    ),
];

/// Classify side-effect categories from the words of a symbol name plus its
/// signature text. Purely lexical; an AST-based escape analyzer would
/// replace this.
pub fn classify_effects(words: &[String], signature: Option<&str>) -> Vec<EffectCategory> {
    let sig_words: Vec<String> = signature
        .map(|s| lci::tokenize(s, 2))
        .unwrap_or_default();

    let mut found = Vec::new();
    for (category, vocab) in EFFECT_VOCAB {
        let hit = words
            .iter()
            .chain(sig_words.iter())
            .any(|w| vocab.contains(&w.as_str()));
        if hit {
            found.push(*category);
        }
    }
    found
}

// ─── Store ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AnnotationStore {
    labels: HashMap<SymbolOrdinal, Vec<SemanticLabel>>,
    effects: HashMap<SymbolOrdinal, Vec<EffectCategory>>,
}

impl AnnotationStore {
    pub fn add_label(&mut self, symbol: SymbolOrdinal, label: SemanticLabel) {
        self.labels.entry(symbol).or_default().push(label);
    }

    pub fn set_effects(&mut self, symbol: SymbolOrdinal, categories: Vec<EffectCategory>) {
        if !categories.is_empty() {
            self.effects.insert(symbol, categories);
        }
    }

    pub fn labels(&self, symbol: SymbolOrdinal) -> &[SemanticLabel] {
        self.labels.get(&symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn effects(&self, symbol: SymbolOrdinal) -> &[EffectCategory] {
        self.effects.get(&symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_pure(&self, symbol: SymbolOrdinal) -> bool {
        self.effects(symbol).is_empty()
    }

    /// Symbols carrying a given label (case-insensitive), with strengths.
    pub fn symbols_with_label(&self, label: &str) -> Vec<(SymbolOrdinal, &SemanticLabel)> {
        let needle = label.to_lowercase();
        let mut out: Vec<(SymbolOrdinal, &SemanticLabel)> = self
            .labels
            .iter()
            .flat_map(|(&sym, labels)| {
                labels
                    .iter()
                    .filter(|l| l.label.to_lowercase() == needle)
                    .map(move |l| (sym, l))
            })
            .collect();
        out.sort_by(|a, b| {
            b.1.strength
                .total_cmp(&a.1.strength)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    /// Symbols carrying any label in a category (case-insensitive).
    pub fn symbols_in_category(&self, category: &str) -> Vec<(SymbolOrdinal, &SemanticLabel)> {
        let needle = category.to_lowercase();
        let mut out: Vec<(SymbolOrdinal, &SemanticLabel)> = self
            .labels
            .iter()
            .flat_map(|(&sym, labels)| {
                labels
                    .iter()
                    .filter(|l| l.category.to_lowercase() == needle)
                    .map(move |l| (sym, l))
            })
            .collect();
        out.sort_by(|a, b| {
            b.1.strength
                .total_cmp(&a.1.strength)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    /// Symbols with at least one effect in `category`.
    pub fn symbols_with_effect(&self, category: EffectCategory) -> Vec<SymbolOrdinal> {
        let mut out: Vec<SymbolOrdinal> = self
            .effects
            .iter()
            .filter(|(_, cats)| cats.contains(&category))
            .map(|(&sym, _)| sym)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn impure_symbols(&self) -> Vec<SymbolOrdinal> {
        let mut out: Vec<SymbolOrdinal> = self.effects.keys().copied().collect();
        out.sort_unstable();
        out
    }

    /// Propagate labels one hop along call edges at half strength, so a
    /// caller of `hashPassword` is discoverable under Authentication even
    /// when its own name says nothing.
    pub fn propagate_labels(&mut self, tracker: &ReferenceTracker) {
        let mut inherited: Vec<(SymbolOrdinal, SemanticLabel)> = Vec::new();
        for edge in tracker.edges() {
            if edge.kind != RefKind::Call {
                continue;
            }
            for label in self.labels(edge.target) {
                if label.propagated {
                    continue;
                }
                let already = self
                    .labels(edge.source)
                    .iter()
                    .any(|l| l.label == label.label);
                if !already {
                    inherited.push((
                        edge.source,
                        SemanticLabel {
                            label: label.label.clone(),
                            category: label.category.clone(),
                            strength: label.strength * 0.5,
                            propagated: true,
                        },
                    ));
                }
            }
        }
        for (sym, label) in inherited {
            let exists = self.labels(sym).iter().any(|l| l.label == label.label);
            if !exists {
                self.add_label(sym, label);
            }
        }
    }

    /// Propagate effects along call edges: a caller of an impure symbol
    /// inherits its categories. Fixed-point iteration bounded by the graph
    /// diameter cap; cycles converge because the category set only grows.
    pub fn propagate_effects(&mut self, tracker: &ReferenceTracker) {
        const MAX_ROUNDS: usize = 16;
        for _ in 0..MAX_ROUNDS {
            let mut changed = false;
            for edge in tracker.edges() {
                if edge.kind != RefKind::Call {
                    continue;
                }
                let inherited: Vec<EffectCategory> = self.effects(edge.target).to_vec();
                if inherited.is_empty() {
                    continue;
                }
                let own = self.effects.entry(edge.source).or_default();
                for cat in inherited {
                    if !own.contains(&cat) {
                        own.push(cat);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        lci::split_identifier(s)
    }

    #[test]
    fn test_classify_effects_io() {
        let cats = classify_effects(&words("writeReport"), None);
        assert!(cats.contains(&EffectCategory::Io));
    }

    #[test]
    fn test_classify_effects_network_from_signature() {
        let cats = classify_effects(&words("process"), Some("fn process(client: HttpClient)"));
        assert!(cats.contains(&EffectCategory::Network));
    }

    #[test]
    fn test_classify_effects_pure() {
        assert!(classify_effects(&words("computeChecksum"), None).is_empty());
    }

    #[test]
    fn test_effect_category_parse() {
        assert_eq!("global_state".parse::<EffectCategory>().unwrap(), EffectCategory::GlobalState);
        assert!("warp".parse::<EffectCategory>().is_err());
    }

    #[test]
    fn test_label_query_sorted_by_strength() {
        let mut store = AnnotationStore::default();
        store.add_label(1, SemanticLabel {
            label: "auth".into(), category: "Authentication".into(), strength: 0.4, propagated: false,
        });
        store.add_label(2, SemanticLabel {
            label: "auth".into(), category: "Authentication".into(), strength: 0.9, propagated: false,
        });
        let hits = store.symbols_with_label("AUTH");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 2);
        assert_eq!(hits[1].0, 1);
    }

    #[test]
    fn test_propagation_through_cycle() {
        let mut tracker = ReferenceTracker::default();
        tracker.add(1, 2, RefKind::Call);
        tracker.add(2, 1, RefKind::Call); // mutual recursion
        tracker.add(2, 3, RefKind::Call);

        let mut store = AnnotationStore::default();
        store.set_effects(3, vec![EffectCategory::Filesystem]);
        store.propagate_effects(&tracker);

        assert!(store.effects(2).contains(&EffectCategory::Filesystem));
        assert!(store.effects(1).contains(&EffectCategory::Filesystem));
        assert!(!store.is_pure(1));
    }

    #[test]
    fn test_pure_symbol_stays_pure() {
        let tracker = ReferenceTracker::default();
        let mut store = AnnotationStore::default();
        store.set_effects(5, Vec::new());
        store.propagate_effects(&tracker);
        assert!(store.is_pure(5));
    }
}

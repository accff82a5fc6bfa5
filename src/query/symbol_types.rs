//! Symbol-type resolver: normalizes user-supplied type names.
//!
//! Resolution priority, first match wins:
//! exact → alias → prefix (min 3 chars) → fuzzy (edit distance ≤ 2) → none.
//! Everything but an exact match produces a warning; nothing fails the query.

use lci::levenshtein;

use crate::index::symbols::SymbolKind;

/// How an input string resolved to a canonical kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    Exact,
    Alias,
    Prefix,
    Fuzzy,
    None,
}

impl TypeMatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Alias => "alias",
            Self::Prefix => "prefix",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub input: String,
    pub kind: Option<SymbolKind>,
    pub matched: TypeMatch,
    pub warning: Option<String>,
}

/// Alias table. `trait` also appears here mapped to `interface` for callers
/// from interface-first languages, but exact resolution of the canonical
/// `trait` kind wins before aliases are consulted.
const ALIASES: &[(&str, &str)] = &[
    ("func", "function"),
    ("fn", "function"),
    ("fun", "function"),
    ("def", "function"),
    ("trait", "interface"),
    ("iface", "interface"),
    ("klass", "class"),
    ("cls", "class"),
    ("var", "variable"),
    ("let", "variable"),
    ("const", "constant"),
    ("ty", "type"),
    ("typealias", "type"),
    ("mod", "module"),
    ("ns", "namespace"),
    ("prop", "property"),
    ("ctor", "constructor"),
    ("init", "constructor"),
    ("obj", "object"),
    ("ext", "extension"),
    ("attr", "annotation"),
    ("anno", "annotation"),
    ("enummember", "enum_member"),
    ("enum-member", "enum_member"),
    ("member", "field"),
];

fn exact(normalized: &str) -> Option<SymbolKind> {
    SymbolKind::ALL
        .iter()
        .find(|k| k.as_str() == normalized)
        .copied()
}

fn alias(normalized: &str) -> Option<SymbolKind> {
    // Direct alias hit, or a plural form of a canonical/alias name.
    if let Some((_, target)) = ALIASES.iter().find(|(a, _)| *a == normalized) {
        return exact(target);
    }
    for stripped in [normalized.strip_suffix("es"), normalized.strip_suffix('s')]
        .into_iter()
        .flatten()
    {
        if let Some(kind) = exact(stripped) {
            return Some(kind);
        }
        if let Some((_, target)) = ALIASES.iter().find(|(a, _)| *a == stripped) {
            return exact(target);
        }
    }
    None
}

fn prefix(normalized: &str) -> Option<SymbolKind> {
    if normalized.len() < 3 {
        return None;
    }
    SymbolKind::ALL
        .iter()
        .find(|k| k.as_str().starts_with(normalized))
        .copied()
}

fn fuzzy(normalized: &str) -> Option<SymbolKind> {
    let mut best: Option<(usize, SymbolKind)> = None;
    for kind in SymbolKind::ALL {
        let dist = levenshtein(normalized, kind.as_str());
        if dist <= 2 && best.is_none_or(|(d, _)| dist < d) {
            best = Some((dist, kind));
        }
    }
    best.map(|(_, k)| k)
}

fn valid_types_hint() -> String {
    SymbolKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve one symbol-type name.
pub fn resolve_type(input: &str) -> ResolvedType {
    let normalized = input.trim().to_lowercase();

    if let Some(kind) = exact(&normalized) {
        return ResolvedType {
            input: input.to_string(),
            kind: Some(kind),
            matched: TypeMatch::Exact,
            warning: None,
        };
    }
    if let Some(kind) = alias(&normalized) {
        return ResolvedType {
            input: input.to_string(),
            kind: Some(kind),
            matched: TypeMatch::Alias,
            warning: Some(format!(
                "symbol type '{}' interpreted as '{}'",
                input.trim(),
                kind.as_str()
            )),
        };
    }
    if let Some(kind) = prefix(&normalized) {
        return ResolvedType {
            input: input.to_string(),
            kind: Some(kind),
            matched: TypeMatch::Prefix,
            warning: Some(format!(
                "symbol type '{}' matched '{}' by prefix",
                input.trim(),
                kind.as_str()
            )),
        };
    }
    if let Some(kind) = fuzzy(&normalized) {
        return ResolvedType {
            input: input.to_string(),
            kind: Some(kind),
            matched: TypeMatch::Fuzzy,
            warning: Some(format!(
                "symbol type '{}' fuzzy-matched '{}'",
                input.trim(),
                kind.as_str()
            )),
        };
    }
    ResolvedType {
        input: input.to_string(),
        kind: None,
        matched: TypeMatch::None,
        warning: Some(format!(
            "unknown symbol type '{}' (ignored); valid types: {}",
            input.trim(),
            valid_types_hint()
        )),
    }
}

/// Resolve a comma-separated type list: deduplicated, first-seen order,
/// warnings collected across entries.
pub fn resolve_type_list(input: &str) -> (Vec<SymbolKind>, Vec<String>) {
    let mut kinds = Vec::new();
    let mut warnings = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let resolved = resolve_type(part);
        if let Some(w) = resolved.warning {
            warnings.push(w);
        }
        if let Some(kind) = resolved.kind
            && !kinds.contains(&kind)
        {
            kinds.push(kind);
        }
    }
    (kinds, warnings)
}

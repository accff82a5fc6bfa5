//! Context lookup engine: resolves object IDs (or a legacy name + file-id
//! pair) to deep symbol context with section filtering.

use serde_json::{json, Value};

use crate::cancel::CancelToken;
use crate::error::{CommonMistake, LciError};
use crate::index::refs::RefKind;
use crate::index::symbols::{SymbolKind, SymbolOrdinal};
use crate::index::CodeIndex;

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Relationships,
    Variables,
    Semantic,
    Structure,
    Usage,
    Ai,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Self::Relationships,
        Self::Variables,
        Self::Semantic,
        Self::Structure,
        Self::Usage,
        Self::Ai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relationships => "relationships",
            Self::Variables => "variables",
            Self::Semantic => "semantic",
            Self::Structure => "structure",
            Self::Usage => "usage",
            Self::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL.iter().find(|sec| sec.as_str() == lower).copied()
    }
}

// ─── Modes ───────────────────────────────────────────────────────────

/// Parameter presets: each mode fixes sections, depth, and AI-text defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMode {
    #[default]
    Full,
    Quick,
    Relationships,
    Semantic,
    Usage,
    Variables,
}

impl ContextMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Some(Self::Full),
            "quick" => Some(Self::Quick),
            "relationships" => Some(Self::Relationships),
            "semantic" => Some(Self::Semantic),
            "usage" => Some(Self::Usage),
            "variables" => Some(Self::Variables),
            _ => None,
        }
    }

    fn sections(&self) -> Vec<Section> {
        match self {
            Self::Full => Section::ALL.to_vec(),
            Self::Quick => vec![Section::Relationships, Section::Structure],
            Self::Relationships => vec![Section::Relationships],
            Self::Semantic => vec![Section::Semantic],
            Self::Usage => vec![Section::Usage],
            Self::Variables => vec![Section::Variables],
        }
    }

    fn default_depth(&self) -> usize {
        match self {
            Self::Full => 5,
            Self::Quick => 2,
            _ => 3,
        }
    }

    fn default_ai_text(&self) -> bool {
        matches!(self, Self::Full)
    }
}

// ─── Request ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
    /// Comma-separated object IDs, already split.
    pub ids: Vec<String>,
    /// Legacy addressing: symbol name + file id.
    pub name: Option<String>,
    pub file_id: Option<u32>,
    pub mode: ContextMode,
    pub include_sections: Vec<Section>,
    pub exclude_sections: Vec<Section>,
    /// Traversal bound override; mode default when None.
    pub max_depth: Option<usize>,
    /// AI-text override; mode default when None.
    pub include_ai_text: Option<bool>,
    /// Minimum semantic label strength to report.
    pub confidence_threshold: f32,
}

impl ContextRequest {
    fn effective_sections(&self) -> Vec<Section> {
        let base = if self.include_sections.is_empty() {
            self.mode.sections()
        } else {
            self.include_sections.clone()
        };
        // Exclude wins.
        base.into_iter()
            .filter(|s| !self.exclude_sections.contains(s))
            .collect()
    }
}

// ─── Lookup ──────────────────────────────────────────────────────────

/// Resolve the request to one context object per addressed symbol.
pub fn lookup_context(
    index: &CodeIndex,
    request: &ContextRequest,
    cancel: &CancelToken,
) -> Result<Value, LciError> {
    let has_ids = !request.ids.is_empty();
    let has_legacy = request.name.is_some();
    if has_ids == has_legacy {
        return Err(LciError::validation(
            "id",
            "exactly one of 'id' or 'name' must be set",
            format!("id set: {}, name set: {}", has_ids, has_legacy),
            "E_EXCLUSIVE_ADDRESS",
            vec![CommonMistake {
                mistake: r#"{"id": "VE", "name": "parse_config"}"#.to_string(),
                corrected: r#"{"id": "VE"}"#.to_string(),
            }],
        ));
    }
    if !index.is_ready() {
        return Err(LciError::IndexUnavailable(
            "index not initialized".to_string(),
        ));
    }

    let mut ordinals: Vec<SymbolOrdinal> = Vec::new();
    if has_ids {
        for id in &request.ids {
            cancel.check()?;
            match index.symbol_by_object_id(id) {
                Some((ordinal, _)) => ordinals.push(ordinal),
                None => {
                    return Err(LciError::NotFound(format!(
                        "no symbol with object ID '{}' in this index generation",
                        id
                    )));
                }
            }
        }
    } else {
        let name = request.name.as_deref().unwrap_or_default();
        let matches: Vec<SymbolOrdinal> = index
            .symbols
            .by_name(name)
            .iter()
            .filter(|&&ord| {
                request.file_id.is_none_or(|fid| {
                    index.symbols.get(ord).is_some_and(|s| s.file_id == fid)
                })
            })
            .copied()
            .collect();
        if matches.is_empty() {
            return Err(LciError::NotFound(format!(
                "no symbol named '{}'{}",
                name,
                request
                    .file_id
                    .map(|f| format!(" in file {}", f))
                    .unwrap_or_default()
            )));
        }
        ordinals.extend(matches);
    }

    let sections = request.effective_sections();
    let depth = request.max_depth.unwrap_or(request.mode.default_depth());
    let ai_text = request
        .include_ai_text
        .unwrap_or(request.mode.default_ai_text());

    let mut out = Vec::new();
    for ordinal in ordinals {
        cancel.check()?;
        out.push(symbol_context(
            index, ordinal, &sections, depth, ai_text, request,
        ));
    }

    Ok(json!({
        "generation": index.generation,
        "symbols": out,
    }))
}

fn edge_entry(index: &CodeIndex, ordinal: SymbolOrdinal, kind: RefKind) -> Value {
    let (name, symbol_kind) = index
        .symbols
        .get(ordinal)
        .map(|s| (s.name.clone(), s.kind.as_str()))
        .unwrap_or_else(|| ("<unknown>".to_string(), "unknown"));
    json!({
        "id": index.symbols.object_id(ordinal),
        "name": name,
        "kind": symbol_kind,
        "edge": kind.as_str(),
    })
}

const MAX_EDGE_LIST: usize = 20;
const MAX_VARIABLES: usize = 20;
const MAX_USAGE_SAMPLES: usize = 5;

fn symbol_context(
    index: &CodeIndex,
    ordinal: SymbolOrdinal,
    sections: &[Section],
    depth: usize,
    ai_text: bool,
    request: &ContextRequest,
) -> Value {
    let symbol = index.symbols.get(ordinal).expect("resolved ordinal");
    let path = index.files.path(symbol.file_id).unwrap_or("");

    let mut obj = json!({
        "id": index.symbols.object_id(ordinal),
        "name": symbol.name,
    });

    for section in sections {
        match section {
            Section::Structure => {
                obj["structure"] = json!({
                    "kind": symbol.kind.as_str(),
                    "path": path,
                    "line": symbol.line,
                    "column": symbol.column,
                    "signature": symbol.signature,
                    "exported": symbol.exported,
                    "complexity": symbol.complexity,
                });
            }
            Section::Relationships => {
                let callers: Vec<Value> = index
                    .refs
                    .incoming(ordinal)
                    .take(MAX_EDGE_LIST)
                    .map(|e| edge_entry(index, e.source, e.kind))
                    .collect();
                let callees: Vec<Value> = index
                    .refs
                    .outgoing(ordinal)
                    .take(MAX_EDGE_LIST)
                    .map(|e| edge_entry(index, e.target, e.kind))
                    .collect();
                let reachable = index.refs.reachable(ordinal, depth);
                obj["relationships"] = json!({
                    "callers": callers,
                    "callees": callees,
                    "reachableWithinDepth": reachable.len(),
                    "depth": depth,
                });
            }
            Section::Variables => {
                let vars: Vec<Value> = index
                    .symbols
                    .in_file(symbol.file_id)
                    .iter()
                    .filter_map(|&ord| index.symbols.get(ord).map(|s| (ord, s)))
                    .filter(|(_, s)| {
                        matches!(
                            s.kind,
                            SymbolKind::Variable | SymbolKind::Constant | SymbolKind::Field
                        )
                    })
                    .take(MAX_VARIABLES)
                    .map(|(ord, s)| {
                        json!({
                            "id": index.symbols.object_id(ord),
                            "name": s.name,
                            "kind": s.kind.as_str(),
                            "line": s.line,
                        })
                    })
                    .collect();
                obj["variables"] = json!(vars);
            }
            Section::Semantic => {
                let labels: Vec<Value> = index
                    .annotations
                    .labels(ordinal)
                    .iter()
                    .filter(|l| l.strength >= request.confidence_threshold)
                    .map(|l| {
                        json!({
                            "label": l.label,
                            "category": l.category,
                            "strength": (l.strength * 100.0).round() / 100.0,
                            "propagated": l.propagated,
                        })
                    })
                    .collect();
                let effects: Vec<&str> = index
                    .annotations
                    .effects(ordinal)
                    .iter()
                    .map(|e| e.as_str())
                    .collect();
                obj["semantic"] = json!({
                    "labels": labels,
                    "effects": effects,
                    "pure": index.annotations.is_pure(ordinal),
                });
            }
            Section::Usage => {
                let stats = index.refs.stats(ordinal);
                let mut samples = Vec::new();
                if let Some(candidates) = index.trigrams.candidates(&symbol.name) {
                    for cand in candidates {
                        if cand.file_id == symbol.file_id && cand.line == symbol.line {
                            continue; // skip the definition itself
                        }
                        if let Some(text) = index.files.line(cand.file_id, cand.line) {
                            samples.push(json!({
                                "path": index.files.path(cand.file_id).unwrap_or(""),
                                "line": cand.line,
                                "text": text.trim(),
                            }));
                        }
                        if samples.len() >= MAX_USAGE_SAMPLES {
                            break;
                        }
                    }
                }
                obj["usage"] = json!({
                    "incoming": stats.incoming,
                    "outgoing": stats.outgoing,
                    "samples": samples,
                });
            }
            Section::Ai => {
                if ai_text {
                    obj["ai"] = json!(describe_symbol(index, ordinal));
                }
            }
        }
    }

    obj
}

/// Plain-language summary for AI consumers.
fn describe_symbol(index: &CodeIndex, ordinal: SymbolOrdinal) -> String {
    let symbol = index.symbols.get(ordinal).expect("resolved ordinal");
    let path = index.files.path(symbol.file_id).unwrap_or("<unknown>");
    let stats = index.refs.stats(ordinal);
    let visibility = if symbol.exported { "exported" } else { "private" };
    format!(
        "{} {} `{}` defined at {}:{} ({} incoming, {} outgoing references).",
        visibility,
        symbol.kind.as_str(),
        symbol.name,
        path,
        symbol.line,
        stats.incoming,
        stats.outgoing,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::symbols::EnhancedSymbol;

    fn test_index() -> CodeIndex {
        let mut idx = CodeIndex::empty(".");
        idx.generation = 1;
        let f0 = idx.files.add(
            "src/svc.rs".to_string(),
            "const LIMIT: usize = 10;\nfn fetch_data() {\n    parse_data();\n}\nfn parse_data() {}\n",
        );
        for (i, text) in idx.files.lines(f0).to_vec().iter().enumerate() {
            idx.trigrams.add_line(f0, i as u32 + 1, text);
        }
        idx.symbols.insert(EnhancedSymbol {
            name: "LIMIT".to_string(),
            kind: SymbolKind::Constant,
            file_id: f0,
            line: 1,
            column: 7,
            signature: None,
            exported: false,
            complexity: 0,
        });
        let fetch = idx.symbols.insert(EnhancedSymbol {
            name: "fetch_data".to_string(),
            kind: SymbolKind::Function,
            file_id: f0,
            line: 2,
            column: 4,
            signature: Some("fn fetch_data()".to_string()),
            exported: false,
            complexity: 1,
        });
        let parse = idx.symbols.insert(EnhancedSymbol {
            name: "parse_data".to_string(),
            kind: SymbolKind::Function,
            file_id: f0,
            line: 5,
            column: 4,
            signature: Some("fn parse_data()".to_string()),
            exported: false,
            complexity: 1,
        });
        idx.refs.add(fetch, parse, RefKind::Call);
        idx
    }

    fn id_request(id: &str) -> ContextRequest {
        ContextRequest {
            ids: vec![id.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_mutual_exclusivity_neither() {
        let idx = test_index();
        let err = lookup_context(&idx, &ContextRequest::default(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, LciError::Validation { .. }));
    }

    #[test]
    fn test_mutual_exclusivity_both() {
        let idx = test_index();
        let request = ContextRequest {
            ids: vec!["A".to_string()],
            name: Some("fetch_data".to_string()),
            ..Default::default()
        };
        let err = lookup_context(&idx, &request, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, LciError::Validation { .. }));
    }

    #[test]
    fn test_object_id_lookup_full_mode() {
        let idx = test_index();
        // fetch_data is the second inserted symbol → ordinal 1 → "B"
        let out = lookup_context(&idx, &id_request("B"), &CancelToken::new()).unwrap();
        let sym = &out["symbols"][0];
        assert_eq!(sym["name"], "fetch_data");
        assert!(sym["structure"].is_object());
        assert!(sym["relationships"].is_object());
        assert!(sym["semantic"].is_object());
        assert!(sym["usage"].is_object());
        assert!(sym["ai"].is_string());
        assert_eq!(sym["relationships"]["callees"][0]["name"], "parse_data");
    }

    #[test]
    fn test_quick_mode_limits_sections() {
        let idx = test_index();
        let request = ContextRequest {
            mode: ContextMode::Quick,
            ..id_request("B")
        };
        let out = lookup_context(&idx, &request, &CancelToken::new()).unwrap();
        let sym = &out["symbols"][0];
        assert!(sym["structure"].is_object());
        assert!(sym["relationships"].is_object());
        assert!(sym.get("semantic").is_none());
        assert!(sym.get("usage").is_none());
        assert!(sym.get("ai").is_none());
        assert_eq!(sym["relationships"]["depth"], 2);
    }

    #[test]
    fn test_single_section_modes() {
        let idx = test_index();
        for (mode, section) in [
            (ContextMode::Relationships, "relationships"),
            (ContextMode::Semantic, "semantic"),
            (ContextMode::Usage, "usage"),
            (ContextMode::Variables, "variables"),
        ] {
            let request = ContextRequest {
                mode,
                ..id_request("B")
            };
            let out = lookup_context(&idx, &request, &CancelToken::new()).unwrap();
            let sym = &out["symbols"][0];
            assert!(sym.get(section).is_some(), "mode {:?}", mode);
            for other in Section::ALL {
                if other.as_str() != section {
                    assert!(sym.get(other.as_str()).is_none(), "mode {:?} leaked {}", mode, other.as_str());
                }
            }
        }
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let idx = test_index();
        let request = ContextRequest {
            include_sections: vec![Section::Structure, Section::Usage],
            exclude_sections: vec![Section::Usage],
            ..id_request("B")
        };
        let out = lookup_context(&idx, &request, &CancelToken::new()).unwrap();
        let sym = &out["symbols"][0];
        assert!(sym["structure"].is_object());
        assert!(sym.get("usage").is_none());
    }

    #[test]
    fn test_comma_separated_ids_resolve_independently() {
        let idx = test_index();
        let request = ContextRequest {
            ids: vec!["A".to_string(), "C".to_string()],
            ..Default::default()
        };
        let out = lookup_context(&idx, &request, &CancelToken::new()).unwrap();
        let symbols = out["symbols"].as_array().unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0]["name"], "LIMIT");
        assert_eq!(symbols[1]["name"], "parse_data");
    }

    #[test]
    fn test_unknown_object_id_is_not_found_with_id() {
        let idx = test_index();
        let err = lookup_context(&idx, &id_request("zZ"), &CancelToken::new()).unwrap_err();
        match err {
            LciError::NotFound(msg) => assert!(msg.contains("zZ")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_name_and_file_id() {
        let idx = test_index();
        let request = ContextRequest {
            name: Some("parse_data".to_string()),
            file_id: Some(0),
            mode: ContextMode::Quick,
            ..Default::default()
        };
        let out = lookup_context(&idx, &request, &CancelToken::new()).unwrap();
        assert_eq!(out["symbols"][0]["name"], "parse_data");
    }

    #[test]
    fn test_index_not_ready_is_unavailable() {
        let idx = CodeIndex::empty(".");
        let err = lookup_context(&idx, &id_request("A"), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, LciError::IndexUnavailable(_)));
    }

    #[test]
    fn test_usage_samples_skip_definition_line() {
        let idx = test_index();
        let request = ContextRequest {
            mode: ContextMode::Usage,
            ..id_request("C")
        };
        let out = lookup_context(&idx, &request, &CancelToken::new()).unwrap();
        let samples = out["symbols"][0]["usage"]["samples"].as_array().unwrap();
        assert!(samples
            .iter()
            .all(|s| !(s["line"] == 5)), "definition line leaked into samples");
        assert!(samples.iter().any(|s| s["line"] == 3));
    }
}

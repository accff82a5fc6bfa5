//! `semantic_annotations` and `side_effects` handlers: label/category
//! queries and purity analysis over the annotation store.

use serde_json::{json, Value};

use crate::cancel::CancelToken;
use crate::error::{CommonMistake, LciError};
use crate::index::annotations::EffectCategory;
use crate::index::symbols::SymbolOrdinal;
use crate::index::CodeIndex;
use crate::mcp::protocol::ToolCallResult;

use super::utils::{get_bool, get_f64, get_str, get_usize};
use super::HandlerContext;

const DEFAULT_MAX_RESULTS: usize = 50;

fn symbol_entry(index: &CodeIndex, ordinal: SymbolOrdinal) -> Value {
    // Annotation-store ordinals should always resolve, but a desync must
    // not take the server down with it.
    let Some(symbol) = index.symbols.get(ordinal) else {
        return json!({
            "id": index.symbols.object_id(ordinal),
            "name": "<unknown>",
        });
    };
    json!({
        "id": index.symbols.object_id(ordinal),
        "name": symbol.name,
        "kind": symbol.kind.as_str(),
        "path": index.files.path(symbol.file_id).unwrap_or(""),
        "line": symbol.line,
    })
}

// ─── semantic_annotations ───────────────────────────────────────────

pub(super) fn handle_semantic_annotations(
    ctx: &HandlerContext,
    args: &Value,
    cancel: &CancelToken,
) -> Result<ToolCallResult, LciError> {
    let label = get_str(args, "label").filter(|s| !s.trim().is_empty());
    let category = get_str(args, "category").filter(|s| !s.trim().is_empty());
    if label.is_none() && category.is_none() {
        return Err(LciError::validation(
            "label",
            "either a label or a category is required",
            "",
            "E_NO_QUERY",
            vec![CommonMistake {
                mistake: r#"{"min_strength": 0.5}"#.to_string(),
                corrected: r#"{"category": "Authentication", "min_strength": 0.5}"#.to_string(),
            }],
        ));
    }

    let min_strength = get_f64(args, "min_strength").unwrap_or(0.0) as f32;
    let include_direct = get_bool(args, "include_direct").unwrap_or(true);
    let include_propagated = get_bool(args, "include_propagated").unwrap_or(true);
    let max_results = get_usize(args, "max_results").unwrap_or(DEFAULT_MAX_RESULTS);

    cancel.check()?;
    let index = ctx
        .index
        .read()
        .map_err(|e| LciError::internal(format!("index lock poisoned: {}", e)))?;

    let hits = match (&label, &category) {
        (Some(l), _) => index.annotations.symbols_with_label(l),
        (None, Some(c)) => index.annotations.symbols_in_category(c),
        (None, None) => unreachable!("validated above"),
    };

    let results: Vec<Value> = hits
        .into_iter()
        .filter(|(_, l)| l.strength >= min_strength)
        .filter(|(_, l)| {
            if l.propagated {
                include_propagated
            } else {
                include_direct
            }
        })
        .take(max_results)
        .map(|(ordinal, l)| {
            let mut entry = symbol_entry(&index, ordinal);
            entry["label"] = json!(l.label);
            entry["category"] = json!(l.category);
            entry["strength"] = json!((l.strength * 100.0).round() / 100.0);
            entry["propagated"] = json!(l.propagated);
            entry
        })
        .collect();

    let output = json!({
        "summary": {
            "total": results.len(),
            "label": label,
            "category": category,
            "minStrength": min_strength,
        },
        "annotations": results,
        "warnings": [],
    });
    Ok(ToolCallResult::success(output.to_string()))
}

// ─── side_effects ───────────────────────────────────────────────────

pub(super) fn handle_side_effects(
    ctx: &HandlerContext,
    args: &Value,
    cancel: &CancelToken,
) -> Result<ToolCallResult, LciError> {
    let mode = get_str(args, "mode").unwrap_or_else(|| "summary".to_string());
    let max_results = get_usize(args, "max_results").unwrap_or(DEFAULT_MAX_RESULTS);

    cancel.check()?;
    let index = ctx
        .index
        .read()
        .map_err(|e| LciError::internal(format!("index lock poisoned: {}", e)))?;

    let output = match mode.as_str() {
        "symbol" => side_effects_symbol(&index, args)?,
        "file" => side_effects_file(&index, args)?,
        "pure" => {
            let symbols: Vec<Value> = index
                .symbols
                .iter()
                .filter(|(ord, s)| s.kind.is_callable() && index.annotations.is_pure(*ord))
                .take(max_results)
                .map(|(ord, _)| symbol_entry(&index, ord))
                .collect();
            json!({ "summary": { "mode": "pure", "total": symbols.len() }, "symbols": symbols })
        }
        "impure" => {
            let symbols: Vec<Value> = index
                .annotations
                .impure_symbols()
                .into_iter()
                .take(max_results)
                .map(|ord| {
                    let mut entry = symbol_entry(&index, ord);
                    entry["effects"] = json!(index
                        .annotations
                        .effects(ord)
                        .iter()
                        .map(|e| e.as_str())
                        .collect::<Vec<_>>());
                    entry
                })
                .collect();
            json!({ "summary": { "mode": "impure", "total": symbols.len() }, "symbols": symbols })
        }
        "category" => {
            let raw = get_str(args, "category").unwrap_or_default();
            let category: EffectCategory = raw.parse().map_err(|_| {
                LciError::validation(
                    "category",
                    "expected io, filesystem, network, global_state, time, or random",
                    raw.clone(),
                    "E_CATEGORY",
                    vec![CommonMistake {
                        mistake: r#"{"mode": "category"}"#.to_string(),
                        corrected: r#"{"mode": "category", "category": "network"}"#.to_string(),
                    }],
                )
            })?;
            let symbols: Vec<Value> = index
                .annotations
                .symbols_with_effect(category)
                .into_iter()
                .take(max_results)
                .map(|ord| symbol_entry(&index, ord))
                .collect();
            json!({
                "summary": { "mode": "category", "category": category.as_str(), "total": symbols.len() },
                "symbols": symbols,
            })
        }
        "summary" => {
            let callable: Vec<SymbolOrdinal> = index
                .symbols
                .iter()
                .filter(|(_, s)| s.kind.is_callable())
                .map(|(ord, _)| ord)
                .collect();
            let impure = callable
                .iter()
                .filter(|&&ord| !index.annotations.is_pure(ord))
                .count();
            let mut by_category = serde_json::Map::new();
            for category in EffectCategory::ALL {
                let count = index.annotations.symbols_with_effect(category).len();
                if count > 0 {
                    by_category.insert(category.as_str().to_string(), json!(count));
                }
            }
            json!({
                "summary": {
                    "mode": "summary",
                    "callable": callable.len(),
                    "pure": callable.len() - impure,
                    "impure": impure,
                    "byCategory": by_category,
                }
            })
        }
        other => {
            return Err(LciError::validation(
                "mode",
                "expected symbol, file, pure, impure, category, or summary",
                other,
                "E_MODE",
                vec![CommonMistake {
                    mistake: format!(r#"{{"mode": "{}"}}"#, other),
                    corrected: r#"{"mode": "summary"}"#.to_string(),
                }],
            ));
        }
    };

    Ok(ToolCallResult::success(output.to_string()))
}

fn side_effects_symbol(index: &CodeIndex, args: &Value) -> Result<Value, LciError> {
    let ordinal = if let Some(id) = get_str(args, "id") {
        index
            .symbol_by_object_id(id.trim())
            .map(|(ord, _)| ord)
            .ok_or_else(|| LciError::NotFound(format!("no symbol with object ID '{}'", id)))?
    } else if let Some(name) = get_str(args, "name") {
        *index
            .symbols
            .by_name(&name)
            .first()
            .ok_or_else(|| LciError::NotFound(format!("no symbol named '{}'", name)))?
    } else {
        return Err(LciError::validation(
            "id",
            "mode=symbol requires an id or a name",
            "",
            "E_NO_SYMBOL",
            vec![CommonMistake {
                mistake: r#"{"mode": "symbol"}"#.to_string(),
                corrected: r#"{"mode": "symbol", "id": "VE"}"#.to_string(),
            }],
        ));
    };

    let mut entry = symbol_entry(index, ordinal);
    entry["pure"] = json!(index.annotations.is_pure(ordinal));
    entry["effects"] = json!(index
        .annotations
        .effects(ordinal)
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>());
    Ok(json!({ "summary": { "mode": "symbol" }, "symbol": entry }))
}

fn side_effects_file(index: &CodeIndex, args: &Value) -> Result<Value, LciError> {
    let path = get_str(args, "path").unwrap_or_default();
    let file_id = index
        .files
        .paths()
        .iter()
        .position(|p| p == &path)
        .ok_or_else(|| LciError::NotFound(format!("no indexed file '{}'", path)))?
        as u32;

    let symbols: Vec<Value> = index
        .symbols
        .in_file(file_id)
        .iter()
        .filter(|&&ord| {
            index
                .symbols
                .get(ord)
                .is_some_and(|s| s.kind.is_callable())
        })
        .map(|&ord| {
            let mut entry = symbol_entry(index, ord);
            entry["pure"] = json!(index.annotations.is_pure(ord));
            entry["effects"] = json!(index
                .annotations
                .effects(ord)
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>());
            entry
        })
        .collect();

    Ok(json!({
        "summary": { "mode": "file", "path": path, "total": symbols.len() },
        "symbols": symbols,
    }))
}

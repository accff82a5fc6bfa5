//! Single source of truth for tool help and best practices.
//! Used by: CLI `lci tips`, the MCP `info` tool, and the MCP `instructions`
//! field sent at initialize.

use serde_json::{json, Value};

/// Help entry for one MCP tool.
pub struct ToolHelp {
    pub name: &'static str,
    pub summary: &'static str,
    pub args: &'static [(&'static str, &'static str)],
    pub example: &'static str,
}

/// A single best practice tip.
pub struct Tip {
    pub rule: &'static str,
    pub why: &'static str,
}

// ─── Single source of truth ─────────────────────────────────────────

pub fn tool_help() -> Vec<ToolHelp> {
    vec![
        ToolHelp {
            name: "search",
            summary: "Multi-pattern code search with semantic expansion, coverage-boosted ranking, and token-budgeted output.",
            args: &[
                ("pattern", "Search pattern. Multi-word input expands into per-word patterns."),
                ("patterns", "Explicit pattern list (alternative to pattern)."),
                ("max", "Max results (default 50, hard cap 100)."),
                ("output", "line | ctx | ctx:N | full | files | count (default ctx)."),
                ("filter", "Path filter; substring or * glob. Prefix with ! to exclude."),
                ("flags", "Comma flags: ci, rx, iv, wb, nt, nc."),
                ("symbol_types", "Comma symbol kinds, e.g. 'function,struct'. Aliases autocorrect."),
                ("max_per_file", "Cap matches per file."),
                ("languages", "Comma extension filter, e.g. 'rs,go'."),
                ("semantic", "Semantic expansion (default true)."),
                ("include", "Metadata: breadcrumbs, safety, refs, deps."),
                ("group", "Group results: file | symbol_type | directory."),
                ("page", "0-based page index."),
            ],
            example: r#"{"pattern": "token estimate", "output": "ctx:3", "flags": "ci,nt"}"#,
        },
        ToolHelp {
            name: "get_context",
            summary: "Resolve object IDs from search results into deep symbol context.",
            args: &[
                ("id", "Comma-separated object IDs from search results."),
                ("name", "Legacy addressing: symbol name (with file_id)."),
                ("file_id", "Legacy addressing: file id for name lookup."),
                ("mode", "full | quick | relationships | semantic | usage | variables."),
                ("include_sections", "Sections to keep."),
                ("exclude_sections", "Sections to drop (wins over include)."),
                ("max_depth", "Relationship traversal bound (mode default otherwise)."),
                ("include_ai_text", "Include the plain-language summary."),
                ("confidence_threshold", "Minimum semantic label strength."),
            ],
            example: r#"{"id": "VE,tG", "mode": "quick"}"#,
        },
        ToolHelp {
            name: "files",
            summary: "Fuzzy multi-term file path search over the indexed file table.",
            args: &[
                ("pattern", "Path pattern; multi-word input matches per word."),
                ("max", "Max paths (default 50, hard cap 200)."),
                ("filter", "Substring or * glob path filter."),
                ("flags", "Accepted for symmetry with search; matching is always case-insensitive."),
                ("directory", "Restrict to one directory."),
                ("languages", "Comma extension filter."),
                ("include_hidden", "Include dot-directories (default false)."),
            ],
            example: r#"{"pattern": "user handler", "directory": "src"}"#,
        },
        ToolHelp {
            name: "code_insight",
            summary: "Codebase intelligence: health, complexity, coupling, cohesion, domains. Returns compact LCF/1.0 text.",
            args: &[
                ("mode", "overview | detailed | statistics | unified | structure."),
                ("tier", "Override the payload tier number."),
                ("analysis", "For detailed: modules | layers | features | terms | relationships."),
                ("metrics", "For statistics: subset of complexity, coupling, cohesion, quality."),
            ],
            example: r#"{"mode": "detailed", "analysis": "modules"}"#,
        },
        ToolHelp {
            name: "semantic_annotations",
            summary: "Query symbols by inferred semantic label or category.",
            args: &[
                ("label", "Label term, e.g. 'auth'."),
                ("category", "Domain category, e.g. 'Authentication'."),
                ("min_strength", "Minimum label strength (default 0)."),
                ("include_direct", "Include directly matched labels (default true)."),
                ("include_propagated", "Include call-graph propagated labels (default true)."),
                ("max_results", "Cap (default 50)."),
            ],
            example: r#"{"category": "Authentication", "min_strength": 0.5}"#,
        },
        ToolHelp {
            name: "side_effects",
            summary: "Purity analysis: which symbols perform io, filesystem, network, global-state, time, or random effects.",
            args: &[
                ("mode", "symbol | file | pure | impure | category | summary."),
                ("id", "Object ID for mode=symbol."),
                ("name", "Symbol name for mode=symbol."),
                ("path", "File path for mode=file."),
                ("category", "Effect category for mode=category."),
                ("max_results", "Cap for list modes (default 50)."),
            ],
            example: r#"{"mode": "category", "category": "network"}"#,
        },
        ToolHelp {
            name: "info",
            summary: "Help for one tool, or this overview.",
            args: &[("tool", "Tool name to describe.")],
            example: r#"{"tool": "search"}"#,
        },
    ]
}

pub fn tips() -> Vec<Tip> {
    vec![
        Tip {
            rule: "Round-trip object IDs",
            why: "Every search result carries an oid; pass it to get_context for relationships, usage, and purity in one call instead of re-searching.",
        },
        Tip {
            rule: "Multi-word patterns beat multiple queries",
            why: "A pattern like 'token estimate budget' expands per word and boosts results matching several words (+15% each, capped at +50%).",
        },
        Tip {
            rule: "Exclude tests for production-only results",
            why: "flags='nt' drops test files; half the hits in typical repos are tests.",
        },
        Tip {
            rule: "Use output=count for reconnaissance",
            why: "Counts cost a few dozen tokens; full results cost thousands. Check the count before pulling pages.",
        },
        Tip {
            rule: "Let flag and type autocorrect work for you",
            why: "flags='regex,i' becomes 'rx,ci' and symbol_types='funct' resolves to 'function' — with warnings, never errors.",
        },
        Tip {
            rule: "code_insight answers architecture questions",
            why: "mode=detailed analysis=modules shows cohesion and instability per package; mode=statistics lists the worst functions with their oids.",
        },
        Tip {
            rule: "Responses are token-budgeted",
            why: "Pages fit a declared budget; hasMore + nextPage continue where the budget stopped. At least 3 results always return.",
        },
    ]
}

// ─── Renderers ──────────────────────────────────────────────────────

/// Render help for one tool (or the overview) as JSON for the `info` tool.
pub fn render_tool_json(tool: Option<&str>) -> Value {
    match tool {
        Some(name) => {
            let lower = name.trim().to_lowercase();
            match tool_help().into_iter().find(|t| t.name == lower) {
                Some(t) => json!({
                    "tool": t.name,
                    "summary": t.summary,
                    "args": t.args.iter().map(|(k, v)| json!({ "name": k, "description": v })).collect::<Vec<_>>(),
                    "example": t.example,
                }),
                None => json!({
                    "error": format!("unknown tool '{}'", name),
                    "availableTools": tool_help().iter().map(|t| t.name).collect::<Vec<_>>(),
                }),
            }
        }
        None => json!({
            "tools": tool_help().iter().map(|t| json!({
                "name": t.name,
                "summary": t.summary,
            })).collect::<Vec<_>>(),
            "bestPractices": tips().iter().map(|t| json!({
                "rule": t.rule,
                "why": t.why,
            })).collect::<Vec<_>>(),
        }),
    }
}

/// Render tips as human-readable CLI output.
pub fn render_cli() -> String {
    let mut out = String::new();
    out.push_str("\nlci — Best Practices & Tips\n");
    out.push_str("═══════════════════════════\n\n");

    out.push_str("BEST PRACTICES\n");
    out.push_str("──────────────\n");
    for (i, tip) in tips().iter().enumerate() {
        out.push_str(&format!("{:2}. {}\n", i + 1, tip.rule));
        out.push_str(&format!("    Why: {}\n\n", tip.why));
    }

    out.push_str("TOOLS\n");
    out.push_str("─────\n");
    for t in tool_help() {
        out.push_str(&format!("  {:22} — {}\n", t.name, t.summary));
    }
    out.push('\n');

    out
}

/// Render compact text for the MCP initialize instructions field.
pub fn render_instructions() -> String {
    let mut out = String::new();
    out.push_str("lci MCP server — semantic code search for AI assistants\n\n");

    for (i, tip) in tips().iter().enumerate() {
        out.push_str(&format!("{}. {}: {}\n", i + 1, tip.rule.to_uppercase(), tip.why));
    }

    out.push_str("\nTOOLS:\n");
    for t in tool_help() {
        out.push_str(&format!("  {} — {}\n", t.name, t.summary));
    }
    out.push_str("\nCall info with {\"tool\": \"<name>\"} for argument details.\n");

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_wire_tool_has_help() {
        let names: Vec<&str> = tool_help().iter().map(|t| t.name).collect();
        for expected in [
            "info",
            "search",
            "get_context",
            "files",
            "code_insight",
            "semantic_annotations",
            "side_effects",
        ] {
            assert!(names.contains(&expected), "missing help for {}", expected);
        }
    }

    #[test]
    fn test_render_tool_json_known() {
        let v = render_tool_json(Some("search"));
        assert_eq!(v["tool"], "search");
        assert!(v["args"].as_array().unwrap().len() > 5);
    }

    #[test]
    fn test_render_tool_json_unknown_lists_tools() {
        let v = render_tool_json(Some("bogus"));
        assert!(v["error"].as_str().unwrap().contains("bogus"));
        assert!(!v["availableTools"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_render_tool_json_overview() {
        let v = render_tool_json(None);
        assert_eq!(v["tools"].as_array().unwrap().len(), tool_help().len());
        assert_eq!(v["bestPractices"].as_array().unwrap().len(), tips().len());
    }

    #[test]
    fn test_render_cli_contains_all_tips() {
        let out = render_cli();
        for tip in tips() {
            assert!(out.contains(tip.rule), "CLI output missing tip: {}", tip.rule);
        }
    }

    #[test]
    fn test_render_instructions_mentions_tools() {
        let text = render_instructions();
        assert!(text.contains("search"));
        assert!(text.contains("get_context"));
        assert!(text.contains("code_insight"));
        assert!(text.contains("info"));
    }
}

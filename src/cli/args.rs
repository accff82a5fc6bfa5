//! CLI argument structs.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(after_long_help = r#"WHAT IS MCP:
  Model Context Protocol (MCP) is a JSON-RPC 2.0 protocol over stdio that
  allows AI agents (VS Code Copilot, Roo/Cline, Claude) to call tools natively.
  The server reads JSON requests from stdin and writes responses to stdout.

EXAMPLES:
  Basic:           lci serve --dir ~/projects/myapp
  Narrow to Rust:  lci serve --dir ~/projects/myapp --ext rs
  Multi-language:  lci serve --dir ~/projects --ext rs,go,py
  With metrics:    lci serve --dir . --metrics
  Verbose logs:    lci serve --dir . --log-level debug

CLIENT CONFIGURATION (.vscode/mcp.json):
  {
    "servers": {
      "lci": {
        "command": "lci",
        "args": ["serve", "--dir", "/home/me/projects/myapp", "--ext", "rs"]
      }
    }
  }

AVAILABLE TOOLS (exposed via MCP):
  search               -- Multi-pattern semantic code search (token-budgeted)
  get_context          -- Object-ID lookup: structure, relationships, usage
  files                -- Fuzzy file path search
  code_insight         -- Health, complexity, coupling, cohesion (LCF/1.0)
  semantic_annotations -- Label/category queries over symbol vocabulary
  side_effects         -- Purity analysis over the call graph
  info                 -- Per-tool help

HOW IT WORKS:
  1. On startup the auto-indexer scans --dir and builds the in-memory index
     in the background; the event loop starts immediately.
  2. Tools answer "index not ready" until the build completes (seconds for
     most repos). Nothing is persisted; a restart rebuilds the index.
  3. All queries run against the in-memory index (sub-millisecond for most).
  4. Logging goes to stderr (never pollutes JSON-RPC on stdout).
"#)]
pub struct ServeArgs {
    /// Directory to index and serve.
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// File extensions to index, comma-separated (default: common languages).
    #[arg(short, long, default_value = "")]
    pub ext: String,

    /// Include hidden files and directories in the index.
    #[arg(long)]
    pub hidden: bool,

    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Include performance metrics in every tool response summary.
    #[arg(long)]
    pub metrics: bool,

    /// Maximum response size in KB before truncation (0 = no limit, default: 16).
    /// Prevents large search results from filling the LLM context window.
    #[arg(long, default_value = "16")]
    pub max_response_kb: usize,

    /// Enable the experimental memory-pressure section in code_insight.
    /// Off by default: the current detector produces false positives.
    #[arg(long)]
    pub memory_pressure: bool,
}

//! MCP server startup: logging, auto-indexer, shutdown wiring, event loop.

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::index::scan::ScanConfig;
use crate::index::CodeIndex;
use crate::indexer::AutoIndexManager;
use crate::mcp;
use crate::mcp::handlers::HandlerContext;

use super::args::ServeArgs;

pub fn cmd_serve(args: ServeArgs) {
    let log_level = match args.log_level.as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let extensions: Vec<String> = args
        .ext
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    info!(dir = %args.dir, ext = %extensions.join(","), "Starting MCP server");

    // Root cancel token: Ctrl-C collapses in-flight queries and the loop.
    let cancel = CancelToken::new();
    {
        let handler_token = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            handler_token.cancel();
        }) {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    }

    // Shared index starts empty; the auto-indexer publishes the first
    // generation when the background build completes.
    let index = Arc::new(RwLock::new(CodeIndex::empty(args.dir.clone())));
    let indexer = AutoIndexManager::new();
    indexer.start(
        Arc::clone(&index),
        ScanConfig {
            dir: args.dir.clone(),
            extensions,
            include_hidden: args.hidden,
        },
        cancel.clone(),
    );

    let mut ctx = HandlerContext::new(index, indexer, cancel);
    ctx.metrics = args.metrics;
    ctx.max_response_bytes = args.max_response_kb.saturating_mul(1024);
    ctx.health.memory_pressure = args.memory_pressure;

    mcp::server::run_server(ctx);
}

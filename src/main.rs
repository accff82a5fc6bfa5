//! Lightning Code Index — in-memory semantic code search and analysis
//! served over MCP stdio.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod cancel;
mod cli;
mod error;
mod index;
mod indexer;
mod insight;
mod mcp;
mod query;
mod semantic;
mod tips;

pub use error::LciError;

fn main() {
    cli::run();
}

//! CLI layer: argument parsing and command dispatch.

pub mod args;
mod serve;

pub use args::ServeArgs;

use clap::{Parser, Subcommand};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Lightning Code Index — in-memory semantic code search over MCP stdio
#[derive(Parser, Debug)]
#[command(name = "lci", version, about, after_help = "\
Run 'lci <COMMAND> --help' for detailed options and examples.\n\
Typical use: lci serve --dir <PROJECT> (wired into an MCP client config)")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Start the MCP (Model Context Protocol) server over stdio.
    Serve(ServeArgs),

    /// Show tool help and best practices.
    Tips,
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve::cmd_serve(args),
        Commands::Tips => print!("{}", crate::tips::render_cli()),
    }
}

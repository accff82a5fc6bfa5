//! MCP (Model Context Protocol) layer: JSON-RPC stdio transport, tool
//! definitions, and handlers.

pub mod handlers;
pub mod protocol;
pub mod server;

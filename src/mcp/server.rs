//! MCP server event loop over stdio: newline-delimited JSON-RPC.
//!
//! stdout carries protocol frames only; all logging goes to stderr.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::mcp::handlers::{self, HandlerContext};
use crate::mcp::protocol::*;

/// Run the server until stdin closes or shutdown is requested.
pub fn run_server(ctx: HandlerContext) {
    let stdin = io::stdin();
    let reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    info!("MCP server ready, waiting for JSON-RPC requests on stdin");

    for line in reader.lines() {
        if ctx.cancel.is_cancelled() {
            info!("Shutdown requested, leaving event loop");
            break;
        }
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "Error reading stdin");
                break;
            }
        };

        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        debug!(request = %line, "Incoming JSON-RPC");

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON-RPC request");
                let err = JsonRpcErrorResponse::new(
                    Value::Null,
                    -32700,
                    format!("Parse error: {}", e),
                );
                let resp = serde_json::to_string(&err).unwrap_or_default();
                let _ = writeln!(writer, "{}", resp);
                let _ = writer.flush();
                continue;
            }
        };

        // Notifications carry no id and get no response.
        if request.id.is_none() {
            debug!(method = %request.method, "Received notification");
            continue;
        }

        let id = request.id.unwrap_or(Value::Null);
        let response = handle_request(&ctx, &request.method, &request.params, id);

        let resp_str = serde_json::to_string(&response).unwrap_or_default();
        debug!(response = %resp_str, "Outgoing JSON-RPC");
        let _ = writeln!(writer, "{}", resp_str);
        let _ = writer.flush();
    }

    info!("stdin closed, shutting down");
}

fn handle_request(
    ctx: &HandlerContext,
    method: &str,
    params: &Option<Value>,
    id: Value,
) -> Value {
    match method {
        "initialize" => {
            let result = InitializeResult::new();
            to_response(id, serde_json::to_value(result).unwrap_or(Value::Null))
        }
        "tools/list" => {
            let result = ToolsListResult {
                tools: handlers::tool_definitions(),
            };
            to_response(id, serde_json::to_value(result).unwrap_or(Value::Null))
        }
        "tools/call" => {
            let Some(params) = params else {
                let result = ToolCallResult::error("Missing params".to_string());
                return to_response(id, serde_json::to_value(result).unwrap_or(Value::Null));
            };

            let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or(Value::Object(serde_json::Map::new()));

            let result = handlers::dispatch_tool(ctx, tool_name, &arguments);
            to_response(id, serde_json::to_value(result).unwrap_or(Value::Null))
        }
        "ping" => to_response(id, json!({})),
        _ => serde_json::to_value(JsonRpcErrorResponse::new(
            id,
            -32601,
            format!("Method not found: {}", method),
        ))
        .unwrap_or(Value::Null),
    }
}

fn to_response(id: Value, result: Value) -> Value {
    serde_json::to_value(JsonRpcResponse::new(id, result)).unwrap_or(Value::Null)
}

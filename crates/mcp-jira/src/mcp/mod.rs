mod sse;
mod stdio;
mod tools;

use std::sync::Arc;

use crate::jira::{IssueService, JiraConfig};
use crate::prelude::*;
use serde::{Deserialize, Serialize};

// JSON-RPC 2.0 error codes
pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

// MCP Protocol types
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Serve the Jira tools to an MCP client")]
pub struct App {
    #[command(subcommand)]
    pub transport: Transport,
}

#[derive(Debug, clap::Subcommand)]
pub enum Transport {
    /// Newline-delimited JSON-RPC over stdin/stdout
    #[clap(name = "stdio")]
    Stdio,

    /// JSON-RPC over HTTP, with an SSE readiness endpoint
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, env = "MCP_JIRA_PORT", default_value = "3000")]
    pub port: u16,

    /// Address to bind to
    #[arg(long, env = "MCP_JIRA_HOST", default_value = "127.0.0.1")]
    pub host: String,
}

/// State shared by every request the server handles.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub global: crate::Global,
    pub service: Arc<IssueService>,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let service = JiraConfig::from_env()?.into_service()?;
    let context = ServerContext {
        global,
        service: Arc::new(service),
    };

    match app.transport {
        Transport::Stdio => stdio::run_stdio(context).await,
        Transport::Sse(options) => sse::run_sse(options, context).await,
    }
}

pub async fn handle_request(request_str: &str, context: &ServerContext) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}"))),
            };
        }
    };

    let result = match request.method.as_str() {
        "initialize" => tools::handle_initialize(),
        "tools/list" => tools::handle_tools_list(),
        "tools/call" => tools::handle_tools_call(request.params, context).await,
        method => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )),
    };

    match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    }
}

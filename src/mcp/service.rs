//! MCP service implementation using rmcp.
//!
//! Bridges `tools/list` and `tools/call` onto the registry and dispatcher.
//! A failed call is reported as a tool result with `isError: true` whose text
//! is the serialized [`ErrorDetail`], never as a protocol error, so the
//! session stays open.
//!
//! [`ErrorDetail`]: crate::mcp::dispatcher::ErrorDetail

use crate::mcp::dispatcher::{Dispatcher, ToolRequest, ToolResponse};
use crate::mcp::registry::JsonObject;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct SqlToolService {
    dispatcher: Arc<Dispatcher>,
}

impl SqlToolService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Tool list advertised to the client, in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher
            .registry()
            .descriptors()
            .map(|d| Tool::new(d.name, d.description, Arc::clone(&d.input_schema)))
            .collect()
    }

    /// Dispatch one call and convert the response to an MCP tool result.
    pub async fn handle_call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let request = ToolRequest::new(name, arguments.unwrap_or_default());
        to_call_result(self.dispatcher.dispatch(request).await)
    }
}

fn to_call_result(response: ToolResponse) -> CallToolResult {
    match (response.payload, response.error) {
        (_, Some(detail)) => {
            let body = serde_json::to_string(&detail).unwrap_or_else(|_| detail.message.clone());
            CallToolResult::error(vec![Content::text(body)])
        }
        (Some(JsonValue::String(text)), None) => CallToolResult::success(vec![Content::text(text)]),
        (Some(payload), None) => CallToolResult::success(vec![Content::text(payload.to_string())]),
        (None, None) => CallToolResult::success(vec![Content::text("null")]),
    }
}

impl ServerHandler for SqlToolService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sql-mcp-server".to_owned(),
                title: Some("SQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "SQL tools for one configured database.\n\
                \n\
                - `run_query`: run a statement; rows come back as a JSON array of arrays in \
                projection order. Only SELECT/SHOW/EXPLAIN unless the database is writable.\n\
                - `export_table`: write a whole table to a CSV file on the server. The first \
                line holds the column names and NULL is an empty field.\n\
                \n\
                Errors come back as tool results with `isError` set and a JSON body holding \
                `kind`, `category`, `message` and an optional `suggestion`."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        debug!("Listing tools");
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.handle_call(&request.name, request.arguments).await)
    }
}

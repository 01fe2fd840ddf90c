//! MCP request handler for the FogBugz tools

use async_trait::async_trait;
use serde_json::{json, Value};

use super::protocol::{
    methods, InitializeResult, McpHandler, McpRequest, McpResponse, ResourceContent,
    ResourceDefinition, ToolCallResult,
};
use super::tools::get_tool_definitions;
use crate::error::FogbugzError;
use crate::tracker::{Tracker, HELP_MARKDOWN};

/// URI of the help resource
pub const HELP_RESOURCE_URI: &str = "help";

/// Routes JSON-RPC methods to the tool layer
pub struct FogbugzHandler {
    tracker: Tracker,
}

impl FogbugzHandler {
    pub fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }

    /// Run one tool and wrap the outcome as MCP content
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        match self.tracker.handle_tool_call(name, arguments).await {
            Ok(value) => ToolCallResult::json(&value),
            Err(e) => {
                if e.is_validation() {
                    tracing::debug!(tool = name, error = %e, "Tool call rejected");
                } else {
                    tracing::warn!(tool = name, code = e.code(), error = %e, "Tool call failed");
                }
                ToolCallResult::error(e.to_string())
            }
        }
    }

    fn help_resource() -> ResourceDefinition {
        ResourceDefinition {
            uri: HELP_RESOURCE_URI.to_string(),
            name: "help".to_string(),
            description: "FogBugz MCP help".to_string(),
            mime_type: "text/markdown".to_string(),
        }
    }
}

#[async_trait]
impl McpHandler for FogbugzHandler {
    async fn handle_request(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            methods::INITIALIZE => {
                let result = InitializeResult::default();
                McpResponse::success(request.id, json!(result))
            }
            methods::INITIALIZED => {
                // Notification, no response needed
                McpResponse::success(request.id, json!({}))
            }
            methods::PING => McpResponse::success(request.id, json!({})),
            methods::LIST_TOOLS => {
                let tools = get_tool_definitions();
                McpResponse::success(request.id, json!({"tools": tools}))
            }
            methods::CALL_TOOL => {
                let Some(name) = request.params.get("name").and_then(|v| v.as_str()) else {
                    return McpResponse::from_error(
                        request.id,
                        FogbugzError::invalid("tools/call requires a tool name"),
                    );
                };
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(json!({}));

                let tool_result = self.call_tool(name, arguments).await;
                McpResponse::success(request.id, json!(tool_result))
            }
            methods::LIST_RESOURCES => McpResponse::success(
                request.id,
                json!({"resources": [Self::help_resource()]}),
            ),
            methods::READ_RESOURCE => {
                let uri = request
                    .params
                    .get("uri")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                if uri != HELP_RESOURCE_URI {
                    return McpResponse::error(
                        request.id,
                        -32602,
                        format!("Unknown resource: {}", uri),
                    );
                }
                let content = ResourceContent {
                    uri: HELP_RESOURCE_URI.to_string(),
                    mime_type: "text/markdown".to_string(),
                    text: HELP_MARKDOWN.to_string(),
                };
                McpResponse::success(request.id, json!({"contents": [content]}))
            }
            _ => McpResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }
}

//! MCP (Model Context Protocol) server implementation
//!
//! JSON-RPC over stdio exposing the FogBugz tools.

pub mod handler;
pub mod protocol;
pub mod tools;

pub use handler::{FogbugzHandler, HELP_RESOURCE_URI};
pub use protocol::{
    methods, InitializeResult, McpHandler, McpRequest, McpResponse, McpServer, ToolCallResult,
    ToolContent,
};
pub use tools::{get_tool_definitions, TOOL_DEFINITIONS};

//! PAN-OS MCP Types - Model Context Protocol wire types.
//!
//! The subset of MCP (JSON-RPC 2.0 framing, initialization, tool listing and
//! invocation, logging level) spoken by the PAN-OS MCP server.
//!
//! # Example
//! ```rust
//! use panos_mcp_types::{PropertySchema, Tool, ToolInputSchema};
//!
//! let tool = Tool::new("retrieve_security_zones", "List security zones")
//!     .with_schema(ToolInputSchema::object()
//!         .property("location", PropertySchema::string().description("Config scope"))
//!         .required(vec!["location"]));
//! assert_eq!(tool.input_schema.required, vec!["location".to_string()]);
//! ```

// ============================================================================
// Module declarations
// ============================================================================

mod capabilities;
mod content;
mod initialization;
mod jsonrpc;
mod logging;
mod tools;

/// MCP method name constants.
pub mod methods;

// ============================================================================
// Protocol Version
// ============================================================================

/// MCP protocol version spoken by the server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// ============================================================================
// Re-exports
// ============================================================================

pub use jsonrpc::{
    ErrorCode, JSONRPC_VERSION, JsonRpcError, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId,
};

pub use initialization::{Implementation, InitializeParams, InitializeResult};

pub use capabilities::{ClientCapabilities, LoggingCapability, ServerCapabilities, ToolsCapability};

pub use tools::{
    CallToolParams, CallToolResult, ListToolsResult, PropertySchema, Tool, ToolInputSchema,
};

pub use content::Content;

pub use logging::{LogLevel, SetLogLevelParams};

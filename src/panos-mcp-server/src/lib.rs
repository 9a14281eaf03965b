//! PAN-OS MCP Server - read-only firewall tools over the Model Context Protocol.
//!
//! This crate provides:
//! - a static, ordered tool registry with parameter validation and uniform
//!   result rendering ([`ToolDispatcher`])
//! - the four PAN-OS tools ([`tools::panos_tools`])
//! - an MCP server with stdio, HTTP and legacy HTTP+SSE transports
//!
//! # Example
//! ```rust,no_run
//! use panos_api::{ClientConfig, PanosClient};
//! use panos_mcp_server::{McpServerBuilder, OutputFormat, tools};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PanosClient::new(ClientConfig::new("fw01.example.com", "API-KEY"))?;
//!     let server = McpServerBuilder::new("panos-mcp", "0.1.0")
//!         .output_format(OutputFormat::Markdown)
//!         .tool_handlers(tools::panos_tools(&client))
//!         .build()?;
//!
//!     server.run_stdio().await
//! }
//! ```

// ============================================================================
// Module declarations
// ============================================================================

mod builder;
mod dispatcher;
mod error;
mod format;
mod handlers;
#[cfg(feature = "http")]
mod http;
mod params;
mod server;
pub mod tools;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::McpServerBuilder;
pub use dispatcher::{
    InvocationLogger, InvocationRecord, ToolDispatcher, ToolFailure, ToolResult,
    TracingInvocationLogger,
};
pub use error::{FailureKind, ToolError};
pub use format::OutputFormat;
pub use handlers::{ToolDescriptor, ToolHandler, ToolInvocation, ToolOutput};
#[cfg(feature = "http")]
pub use http::{SessionRegistry, router, router_with_sessions};
pub use params::{ParamSpec, Params, REDACTED, validate};
pub use server::{McpServer, ServerState};

pub use panos_mcp_types;

// ============================================================================
// Tests
// ============================================================================

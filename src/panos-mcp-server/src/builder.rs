//! MCP Server builder for easy server construction.

use std::sync::Arc;

use anyhow::{Context, Result};
use panos_mcp_types::{Implementation, ServerCapabilities};

use crate::dispatcher::{InvocationLogger, ToolDispatcher};
use crate::format::OutputFormat;
use crate::handlers::ToolHandler;
use crate::server::McpServer;

/// Builder for creating MCP servers.
pub struct McpServerBuilder {
    name: String,
    version: String,
    capabilities: ServerCapabilities,
    tools: Vec<Arc<dyn ToolHandler>>,
    format: OutputFormat,
    logger: Option<Arc<dyn InvocationLogger>>,
    instructions: Option<String>,
}

impl McpServerBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            capabilities: ServerCapabilities::default().with_tools().with_logging(),
            tools: Vec::new(),
            format: OutputFormat::default(),
            logger: None,
            instructions: None,
        }
    }

    /// Add a tool handler.
    pub fn tool_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.tools.push(handler);
        self
    }

    /// Add several handlers, keeping their order.
    pub fn tool_handlers(self, handlers: impl IntoIterator<Item = Arc<dyn ToolHandler>>) -> Self {
        handlers
            .into_iter()
            .fold(self, |builder, handler| builder.tool_handler(handler))
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Replace the default `tracing` invocation logger.
    pub fn invocation_logger(mut self, logger: Arc<dyn InvocationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Set instructions for clients.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Build the server. Fails on duplicate tool names.
    pub fn build(self) -> Result<Arc<McpServer>> {
        let mut dispatcher = ToolDispatcher::new(self.format);
        if let Some(logger) = self.logger {
            dispatcher = dispatcher.with_logger(logger);
        }
        for handler in self.tools {
            dispatcher
                .register(handler)
                .context("Failed to register tool")?;
        }

        let info = Implementation::new(&self.name, &self.version);
        let mut server = McpServer::new(info, self.capabilities, dispatcher);
        server.instructions = self.instructions;
        Ok(Arc::new(server))
    }

    /// Build and run the server with stdio transport.
    pub async fn build_and_run_stdio(self) -> Result<()> {
        let server = self.build()?;
        server.run_stdio().await
    }
}

//! MCP Server core implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use panos_mcp_types::{
    CallToolParams, Implementation, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    LogLevel, ServerCapabilities, SetLogLevelParams, Tool, methods,
};

use crate::dispatcher::ToolDispatcher;

/// MCP server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No `initialize` seen yet.
    Uninitialized,
    /// `initialize` answered, waiting for `notifications/initialized`.
    Initializing,
    Ready,
    ShuttingDown,
    Stopped,
}

/// MCP Server implementation.
///
/// Shared by every transport session; all mutable state sits behind locks.
pub struct McpServer {
    pub(crate) info: Implementation,
    pub(crate) capabilities: ServerCapabilities,
    pub(crate) dispatcher: ToolDispatcher,
    pub(crate) log_level: RwLock<LogLevel>,
    pub(crate) state: RwLock<ServerState>,
    pub(crate) running: AtomicBool,
    /// Client info from the most recent `initialize`.
    pub(crate) client_info: RwLock<Option<Implementation>>,
    pub(crate) instructions: Option<String>,
}

impl McpServer {
    pub fn new(info: Implementation, capabilities: ServerCapabilities, dispatcher: ToolDispatcher) -> Self {
        Self {
            info,
            capabilities,
            dispatcher,
            log_level: RwLock::new(LogLevel::Info),
            state: RwLock::new(ServerState::Uninitialized),
            running: AtomicBool::new(false),
            client_info: RwLock::new(None),
            instructions: None,
        }
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher.tools()
    }

    pub async fn log_level(&self) -> LogLevel {
        *self.log_level.read().await
    }

    pub async fn client_info(&self) -> Option<Implementation> {
        self.client_info.read().await.clone()
    }

    // ========================================================================
    // Request Handlers
    // ========================================================================

    /// Decode and handle one framed message. Returns the response to send
    /// back, `None` for notifications.
    pub async fn handle_raw(&self, raw: &str) -> Option<JsonRpcResponse> {
        match JsonRpcMessage::parse(raw) {
            Ok(message) => self.handle_message(message).await,
            Err(error) => {
                warn!(code = error.code, error = %error.message, "Undecodable JSON-RPC message");
                Some(JsonRpcResponse::undecodable(error))
            }
        }
    }

    pub async fn handle_message(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, id = %request.id, "Handling request");

        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request.params).await,
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => self.handle_list_tools(),
            methods::TOOLS_CALL => self.handle_call_tool(request.params).await,
            methods::LOGGING_SET_LEVEL => self.handle_set_log_level(request.params).await,
            _ => Err(JsonRpcError::method_not_found(&request.method)),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(request.id, error),
        }
    }

    /// Handle a JSON-RPC notification.
    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        debug!(method = %notification.method, "Handling notification");

        match notification.method.as_str() {
            methods::INITIALIZED => {
                *self.state.write().await = ServerState::Ready;
                info!("Server initialized and ready");
            }
            methods::CANCELLED => {
                // Tool calls are short, bounded reads; nothing to cancel.
                debug!("Cancellation notification ignored");
            }
            _ => {
                warn!(method = %notification.method, "Unknown notification");
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))?
            .unwrap_or_default();

        // Sessions over HTTP share one server, so a repeated initialize is
        // answered rather than rejected.
        {
            let mut state = self.state.write().await;
            let previous = *state;
            if previous != ServerState::Uninitialized {
                debug!(state = ?previous, "Re-initialization");
            }
            *state = ServerState::Initializing;
        }
        *self.client_info.write().await = Some(init_params.client_info.clone());

        info!(
            client = %init_params.client_info.name,
            version = %init_params.client_info.version,
            protocol = %init_params.protocol_version,
            "Client connected"
        );

        let result = InitializeResult::new(self.info.clone(), self.capabilities.clone())
            .with_instructions(self.instructions.clone());
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult::new(self.tools());
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let call_params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))
            })?;

        debug!(tool = %call_params.name, "Calling tool");

        // Unknown tools and tool failures are reported in-band so the
        // session survives.
        let result = self
            .dispatcher
            .invoke(&call_params.name, call_params.arguments)
            .await
            .into_call_result();
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_set_log_level(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let level_params: SetLogLevelParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))
            })?;

        *self.log_level.write().await = level_params.level;
        debug!(level = %level_params.level, "Log level changed");

        Ok(json!({}))
    }

    // ========================================================================
    // Transport: Stdio
    // ========================================================================

    /// Run the server with stdio transport.
    pub async fn run_stdio(self: Arc<Self>) -> Result<()> {
        info!(server = %self.info.name, "Starting MCP server with stdio transport");
        let reader = BufReader::new(tokio::io::stdin());
        self.serve_lines(reader, tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC until EOF or [`McpServer::stop`].
    pub async fn serve_lines<R, W>(self: Arc<Self>, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.running.store(true, Ordering::SeqCst);
        let mut line = String::new();

        while self.running.load(Ordering::SeqCst) {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!("EOF received, shutting down");
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Some(response) = self.handle_raw(trimmed).await {
                        let response_json = serde_json::to_string(&response)
                            .context("Failed to serialize response")?;
                        writer
                            .write_all(response_json.as_bytes())
                            .await
                            .context("Failed to write response")?;
                        writer.write_all(b"\n").await?;
                        writer.flush().await?;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Error reading from stdin");
                    break;
                }
            }
        }

        *self.state.write().await = ServerState::Stopped;
        self.running.store(false, Ordering::SeqCst);
        info!("MCP server stopped");

        Ok(())
    }

    // ========================================================================
    // Transport: HTTP
    // ========================================================================

    /// Run the HTTP transport (`POST /`, `GET /health`) and the legacy SSE
    /// transport (`GET /sse`, `POST /messages`) on `addr`.
    #[cfg(feature = "http")]
    pub async fn run_http(self: Arc<Self>, addr: std::net::SocketAddr) -> Result<()> {
        info!(server = %self.info.name, addr = %addr, "Starting MCP server with HTTP transport");
        self.running.store(true, Ordering::SeqCst);

        let app = crate::http::router(self.clone());
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        axum::serve(listener, app).await.context("HTTP server failed")?;

        *self.state.write().await = ServerState::Stopped;
        self.running.store(false, Ordering::SeqCst);

        Ok(())
    }

    /// Stop the server.
    pub async fn stop(&self) {
        info!("Stopping MCP server");
        *self.state.write().await = ServerState::ShuttingDown;
        self.running.store(false, Ordering::SeqCst);
    }
}

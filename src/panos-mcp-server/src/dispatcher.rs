//! Tool registry and invocation pipeline.
//!
//! The dispatcher owns a static, ordered set of handlers. Every call goes
//! through the same steps: look the tool up, validate parameters, run the
//! handler, render the output. Whatever happens, the caller gets a
//! [`ToolResult`] and one log line is emitted through the injected
//! [`InvocationLogger`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use panos_mcp_types::{CallToolResult, Tool};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FailureKind, ToolError};
use crate::format::OutputFormat;
use crate::handlers::{ToolDescriptor, ToolHandler, ToolInvocation};
use crate::params::validate;

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Success(String),
    Failure(ToolFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ToolResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Rendered output or failure message.
    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) => text,
            Self::Failure(failure) => &failure.message,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    pub fn into_call_result(self) -> CallToolResult {
        match self {
            Self::Success(text) => CallToolResult::text(text),
            Self::Failure(failure) => CallToolResult::error(failure.message),
        }
    }
}

/// One finished invocation, as handed to an [`InvocationLogger`].
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub correlation_id: Uuid,
    pub tool: String,
    /// Parameters with sensitive values redacted.
    pub params: Vec<(String, String)>,
    pub failure: Option<ToolFailure>,
    pub elapsed: Duration,
}

/// Sink for per-invocation log lines.
pub trait InvocationLogger: Send + Sync {
    fn record(&self, record: &InvocationRecord);
}

/// Emits invocation records as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInvocationLogger;

impl InvocationLogger for TracingInvocationLogger {
    fn record(&self, record: &InvocationRecord) {
        let params = format_params(&record.params);
        let elapsed_ms = elapsed_millis(record.elapsed);
        match &record.failure {
            None => tracing::info!(
                correlation_id = %record.correlation_id,
                tool = %record.tool,
                params = %params,
                elapsed_ms,
                "tool invocation succeeded"
            ),
            Some(failure)
                if matches!(
                    failure.kind,
                    FailureKind::UnknownTool | FailureKind::Validation
                ) =>
            {
                tracing::warn!(
                    correlation_id = %record.correlation_id,
                    tool = %record.tool,
                    params = %params,
                    kind = %failure.kind,
                    error = %failure.message,
                    "tool invocation rejected"
                )
            }
            Some(failure) => tracing::error!(
                correlation_id = %record.correlation_id,
                tool = %record.tool,
                params = %params,
                kind = %failure.kind,
                error = %failure.message,
                elapsed_ms,
                "tool invocation failed"
            ),
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn format_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered registry of tool handlers.
pub struct ToolDispatcher {
    handlers: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)>,
    index: HashMap<String, usize>,
    format: OutputFormat,
    logger: Arc<dyn InvocationLogger>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.index.keys().collect::<Vec<_>>())
            .field("format", &self.format)
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            handlers: Vec::new(),
            index: HashMap::new(),
            format,
            logger: Arc::new(TracingInvocationLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn InvocationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Add a handler. Names must be unique.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), ToolError> {
        let descriptor = handler.descriptor();
        if self.index.contains_key(&descriptor.name) {
            return Err(ToolError::DuplicateTool(descriptor.name));
        }
        tracing::debug!(tool = %descriptor.name, "registered tool");
        self.index.insert(descriptor.name.clone(), self.handlers.len());
        self.handlers.push((descriptor, handler));
        Ok(())
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Descriptors in registration order.
    pub fn list_tools(&self) -> Vec<&ToolDescriptor> {
        self.handlers.iter().map(|(d, _)| d).collect()
    }

    /// MCP `Tool` definitions in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.handlers.iter().map(|(d, _)| d.to_tool()).collect()
    }

    /// Run a tool. Never fails: every error becomes [`ToolResult::Failure`].
    pub async fn invoke(&self, name: &str, arguments: Option<Value>) -> ToolResult {
        let started = Instant::now();
        let correlation_id = Uuid::new_v4();

        let Some(&position) = self.index.get(name) else {
            let failure = failure(ToolError::UnknownTool(name.to_string()), None);
            self.log(correlation_id, name, Vec::new(), Some(&failure), started);
            return ToolResult::Failure(failure);
        };
        let (descriptor, handler) = &self.handlers[position];

        let params = match validate(&descriptor.params, arguments.as_ref()) {
            Ok(params) => params,
            Err(e) => {
                let failure = failure(e, None);
                self.log(correlation_id, name, Vec::new(), Some(&failure), started);
                return ToolResult::Failure(failure);
            }
        };
        let logged_params = params.redacted(&descriptor.params);

        let invocation = ToolInvocation {
            tool: descriptor.name.clone(),
            params,
            correlation_id,
        };
        let rendered = match handler.execute(&invocation).await {
            Ok(output) => self.format.render(&descriptor.subject, &output),
            Err(e) => Err(e),
        };

        match rendered {
            Ok(text) => {
                self.log(correlation_id, name, logged_params, None, started);
                ToolResult::Success(text)
            }
            Err(e) => {
                let failure = failure(e, Some(&descriptor.subject));
                self.log(correlation_id, name, logged_params, Some(&failure), started);
                ToolResult::Failure(failure)
            }
        }
    }

    fn log(
        &self,
        correlation_id: Uuid,
        tool: &str,
        params: Vec<(String, String)>,
        failure: Option<&ToolFailure>,
        started: Instant,
    ) {
        self.logger.record(&InvocationRecord {
            correlation_id,
            tool: tool.to_string(),
            params,
            failure: failure.cloned(),
            elapsed: started.elapsed(),
        });
    }
}

/// Validation failures are reported verbatim; anything raised while
/// retrieving data is prefixed with what was being retrieved.
fn failure(error: ToolError, subject: Option<&str>) -> ToolFailure {
    let kind = error.kind();
    let message = match (kind, subject) {
        (FailureKind::Validation | FailureKind::UnknownTool, _) | (_, None) => error.to_string(),
        (_, Some(subject)) => format!("Error retrieving {subject}: {error}"),
    };
    ToolFailure { kind, message }
}

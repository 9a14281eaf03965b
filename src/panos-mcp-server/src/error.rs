//! Tool-level errors.

use panos_api::{ErrorKind, PanosError};

/// Error raised while validating or executing a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    #[error("Invalid parameters: expected an object")]
    NotAnObject,

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {name} ({reason})")]
    InvalidParameter { name: String, reason: String },

    #[error(transparent)]
    Api(#[from] PanosError),

    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl ToolError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnknownTool(_) => FailureKind::UnknownTool,
            Self::NotAnObject | Self::MissingParameter(_) | Self::InvalidParameter { .. } => {
                FailureKind::Validation
            }
            Self::Api(e) => match e.kind() {
                ErrorKind::Validation => FailureKind::Validation,
                ErrorKind::Transport => FailureKind::Transport,
                ErrorKind::Upstream => FailureKind::Upstream,
                ErrorKind::Malformed => FailureKind::MalformedResponse,
                ErrorKind::Config => FailureKind::Internal,
            },
            Self::DuplicateTool(_) | Self::Render(_) => FailureKind::Internal,
        }
    }
}

/// Coarse failure category carried by a failed [`crate::ToolResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Transport,
    Upstream,
    MalformedResponse,
    UnknownTool,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::Upstream => "upstream",
            Self::MalformedResponse => "malformed_response",
            Self::UnknownTool => "unknown_tool",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

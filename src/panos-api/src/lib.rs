//! PAN-OS XML API client.
//!
//! Issues authenticated `GET /api/` calls against a Palo Alto Networks
//! firewall or Panorama, parses the XML envelope and turns configuration
//! entries into [`FirewallRecord`]s.

mod client;
mod records;
mod xml;
mod xpath;

use std::time::Duration;

pub use client::{ClientConfig, PanosClient, RequestKind, Target, TargetKind};
pub use records::{
    FieldValue, FirewallRecord, NO_SYSTEM_INFO, parse_address_entry, parse_policy_entry, parse_system_info,
    parse_zone_entry,
};
pub use xml::{Descendants, XmlElement, parse_envelope};
pub use xpath::{DEVICE_ENTRY_XPATH, Location, Scope};

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Virtual system queried when a caller does not name one.
pub const DEFAULT_VSYS: &str = "vsys1";

/// Coarse classification of a [`PanosError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied value rejected before any network call.
    Validation,
    /// DNS, TCP, TLS or timeout failure.
    Transport,
    /// The firewall answered, but with an error status.
    Upstream,
    /// The body was not the expected XML envelope.
    Malformed,
    /// Client could not be constructed.
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::Upstream => "upstream",
            Self::Malformed => "malformed_response",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// Error types for PAN-OS API operations
#[derive(Debug, thiserror::Error)]
pub enum PanosError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid parameter: {name} ({reason})")]
    InvalidParameter { name: String, reason: String },

    /// The request URL is stripped before this is built; it carries the key.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl PanosError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidParameter { .. } => ErrorKind::Validation,
            Self::Transport(_) | Self::Timeout(_) => ErrorKind::Transport,
            Self::Http { .. } | Self::Api { .. } => ErrorKind::Upstream,
            Self::MalformedResponse(_) => ErrorKind::Malformed,
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for PAN-OS API operations
pub type Result<T> = std::result::Result<T, PanosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PanosError::Api {
                message: "x".into(),
                code: None
            }
            .kind(),
            ErrorKind::Upstream
        );
        assert_eq!(PanosError::Http { status: 503 }.kind(), ErrorKind::Upstream);
        assert_eq!(
            PanosError::Timeout(DEFAULT_TIMEOUT).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            PanosError::MalformedResponse("x".into()).kind(),
            ErrorKind::Malformed
        );
        assert_eq!(
            PanosError::invalid("vsys", "empty").kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_api_error_message_is_verbatim() {
        let err = PanosError::Api {
            message: "API key authentication failed".into(),
            code: Some("403".into()),
        };
        assert_eq!(err.to_string(), "API error: API key authentication failed");
    }
}

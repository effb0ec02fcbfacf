//! Server-level error classification.
//!
//! Every component error is folded into [`ServerError`] and mapped to a
//! stable machine-readable kind before it crosses the wire. Clients match
//! on the kind, never on message text.

use serde::Serialize;
use thiserror::Error;

use maestro_agent::AgentError;
use maestro_proxy::ProxyError;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed or missing request parameters.
    #[error("{0}")]
    BadRequest(String),

    /// The catalogue has no tool with this name.
    #[error("unknown tool '{0}'")]
    UnknownCatalogueTool(String),

    /// A host tool ran and failed.
    #[error("tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// An orchestration component failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A proxy operation failed outside the agent layer.
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl ServerError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// The stable kind string clients dispatch on.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::UnknownCatalogueTool(_) => "not_found",
            Self::ToolFailed { .. } => "tool_error",
            Self::Agent(e) => match e {
                AgentError::AgentNotFound(_) | AgentError::SessionNotFound(_) => "not_found",
                AgentError::AlreadyExists(_) => "conflict",
                AgentError::InvalidModel { .. } | AgentError::InvalidDefinition(_) => "bad_request",
                AgentError::Composition { .. } => "composition_error",
                AgentError::CyclicComposition { .. } => "cyclic_composition",
                AgentError::ToolResolution { .. } => "tool_resolution",
                AgentError::SessionBusy(_) => "session_busy",
                AgentError::Backend(_) => "backend_error",
                AgentError::Proxy(e) => proxy_kind(e),
            },
            Self::Proxy(e) => proxy_kind(e),
        }
    }

    /// The body sent to clients in place of a result.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: "error",
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

fn proxy_kind(e: &ProxyError) -> &'static str {
    match e {
        ProxyError::LaunchFailed { .. } => "launch_failed",
        ProxyError::HandshakeTimeout { .. } => "handshake_timeout",
        ProxyError::ProxyTimeout { .. } => "proxy_timeout",
        ProxyError::ProxyUnavailable { .. } => "proxy_unavailable",
        ProxyError::NotFound(_) | ProxyError::UnknownTool { .. } => "not_found",
        ProxyError::Server { .. } => "proxy_error",
        ProxyError::ConnectionClosed
        | ProxyError::Protocol(_)
        | ProxyError::Json(_)
        | ProxyError::Io(_) => "proxy_error",
    }
}

/// Wire shape for a failed tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub kind: &'static str,
    pub message: String,
}

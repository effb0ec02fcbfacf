//! Error types for proxy transport and lifecycle management.

use maestro_types::ProxyId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The proxy child process could not be spawned.
    #[error("failed to launch proxy '{command}': {reason}")]
    LaunchFailed { command: String, reason: String },

    /// The child started but did not complete the initialize handshake in time.
    #[error("proxy '{command}' did not complete handshake within {timeout_ms}ms")]
    HandshakeTimeout { command: String, timeout_ms: u64 },

    /// A tool call exceeded the per-invocation deadline. The child is left
    /// running; only this call is abandoned.
    #[error("proxied tool '{tool}' timed out after {timeout_ms}ms")]
    ProxyTimeout { tool: String, timeout_ms: u64 },

    /// The proxy exists but is not in a state that can serve calls.
    #[error("proxy {id} is unavailable ({state})")]
    ProxyUnavailable { id: ProxyId, state: String },

    /// No proxy registered under this id.
    #[error("no proxy registered with id {0}")]
    NotFound(ProxyId),

    /// The proxy is alive but does not expose the requested tool.
    #[error("proxy {id} does not expose tool '{tool}'")]
    UnknownTool { id: ProxyId, tool: String },

    /// The child's stdio pipe closed mid-exchange.
    #[error("proxy connection closed")]
    ConnectionClosed,

    /// Malformed frame or JSON-RPC envelope from the child.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The child returned a JSON-RPC error object.
    #[error("proxy returned error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    pub fn launch_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LaunchFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// True when the underlying channel is gone and the handle should be
    /// marked failed rather than retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::Io(_) | Self::LaunchFailed { .. }
        )
    }
}

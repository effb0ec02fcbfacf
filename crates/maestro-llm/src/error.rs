//! Error types for the model backend crate.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for model backend operations.
///
/// Backend errors are surfaced verbatim to the caller and never retried by
/// the orchestration core; they typically require caller-side configuration
/// fixes (missing API keys, quota, bad model ids).
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API credentials are configured for the backend.
    #[error("missing credentials for {backend}: set {env_hint}")]
    MissingCredentials {
        /// Backend name.
        backend: String,
        /// Environment variable(s) the user should set.
        env_hint: String,
    },

    /// The backend service could not be reached or is overloaded.
    #[error("model backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the request.
    #[error("model API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the provider.
        message: String,
    },

    /// The backend returned a response we could not interpret.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Create a missing-credentials error.
    pub fn missing_credentials(backend: impl Into<String>, env_hint: impl Into<String>) -> Self {
        Self::MissingCredentials {
            backend: backend.into(),
            env_hint: env_hint.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid-response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// Error produced by a resolved tool handle during model-driven invocation.
///
/// Tool failures are not backend failures: they are fed back to the model as
/// error output so it can recover or report.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ToolInvokeError(pub String);

impl ToolInvokeError {
    /// Create a tool invocation error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

//! Error types for agent orchestration.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// No agent registered under this name.
    #[error("agent '{0}' not found")]
    AgentNotFound(String),

    /// An agent with this name already exists and overwrite was not set.
    #[error("agent '{0}' already exists")]
    AlreadyExists(String),

    /// The model id is not on the supported list.
    #[error("unsupported model '{model}' (supported: {supported})")]
    InvalidModel { model: String, supported: String },

    /// A definition failed structural validation before registration.
    #[error("invalid agent definition: {0}")]
    InvalidDefinition(String),

    /// Composition referenced sub-agents that do not exist. Nothing was
    /// registered.
    #[error("unknown sub-agents: {}", missing.join(", "))]
    Composition { missing: Vec<String> },

    /// Registering the coordinator would make its own name reachable
    /// through sub-agent bindings.
    #[error("composing '{agent}' would create a delegation cycle via '{through}'")]
    CyclicComposition { agent: String, through: String },

    /// A tool binding could not be resolved to a callable handle.
    #[error("agent '{agent}': cannot resolve tool binding '{binding}': {reason}")]
    ToolResolution {
        agent: String,
        binding: String,
        reason: String,
    },

    /// Another run already holds this session.
    #[error("session '{0}' is busy with another run")]
    SessionBusy(String),

    /// No session recorded under this id.
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// The model backend failed. Surfaced verbatim, never retried here.
    #[error("backend error: {0}")]
    Backend(#[from] maestro_llm::LlmError),

    /// A proxy operation failed.
    #[error(transparent)]
    Proxy(#[from] maestro_proxy::ProxyError),
}

impl AgentError {
    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }

    pub fn tool_resolution(
        agent: impl Into<String>,
        binding: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ToolResolution {
            agent: agent.into(),
            binding: binding.into(),
            reason: reason.into(),
        }
    }
}

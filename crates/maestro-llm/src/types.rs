//! Request types shared by all model backends.

use maestro_types::Turn;
use serde::{Deserialize, Serialize};

/// A single-turn generation request.
///
/// Carries everything the backend needs for one exchange: the agent's
/// instruction, the session's prior turns as context, and the new user
/// message. Tool handles are passed separately since they are not
/// serializable.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Model identifier (already validated by the registry).
    pub model: String,
    /// System instruction for the agent.
    pub instruction: String,
    /// Prior turns of the session, oldest first. Does not include `message`.
    pub history: Vec<Turn>,
    /// The new user message.
    pub message: String,
}

impl GenerateRequest {
    /// Create a request with no prior history.
    pub fn new(
        model: impl Into<String>,
        instruction: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            instruction: instruction.into(),
            history: Vec::new(),
            message: message.into(),
        }
    }

    /// Attach prior session history.
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

/// A tool definition as presented to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique within one request).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

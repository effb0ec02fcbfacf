//! Model backend trait and tool handle abstraction.
//!
//! The orchestration core treats the language model as an opaque
//! collaborator behind [`ModelBackend`]. Resolved tools are handed to the
//! backend as [`ToolHandle`]s; whether and how the model uses them is
//! entirely the backend's business; the core encodes no routing rules.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Result, ToolInvokeError};
use crate::types::{GenerateRequest, ToolDefinition};

// ─────────────────────────────────────────────────────────────────────────────
// Tool Handles
// ─────────────────────────────────────────────────────────────────────────────

/// A callable tool, fully resolved from an agent's symbolic binding.
///
/// Implementations cover built-in tools, proxied external tools, and
/// sub-agents wrapped as tools.
#[async_trait]
pub trait ToolHandle: Send + Sync {
    /// Unique tool name within one generation request.
    fn name(&self) -> &str;

    /// Human-readable description the model sees.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input.
    fn parameters(&self) -> serde_json::Value;

    /// Invoke the tool. Errors are fed back to the model as error output,
    /// not surfaced as backend failures.
    async fn invoke(
        &self,
        args: serde_json::Value,
    ) -> std::result::Result<String, ToolInvokeError>;

    /// The definition advertised to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

/// Find a handle by name.
pub fn find_handle<'a>(
    tools: &'a [Arc<dyn ToolHandle>],
    name: &str,
) -> Option<&'a Arc<dyn ToolHandle>> {
    tools.iter().find(|t| t.name() == name)
}

// ─────────────────────────────────────────────────────────────────────────────
// Model Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for model invocation backends.
///
/// One call drives one agent turn: the backend receives the instruction,
/// prior history, the new message, and the resolved tools, and returns the
/// final reply text. Tool-use loops, prompt formatting, and streaming are
/// backend-internal.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generate the agent's reply for one turn.
    async fn generate(
        &self,
        request: GenerateRequest,
        tools: &[Arc<dyn ToolHandle>],
    ) -> Result<String>;

    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Check that the backend is reachable and configured.
    async fn health_check(&self) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend (for testing)
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted backend for tests.
///
/// Replies are popped from a queue in order; when the queue is empty the
/// backend echoes the incoming message. A reply of the form
/// `call:<tool>:<json-args>` invokes the named tool handle and returns its
/// output, letting tests exercise tool resolution end to end.
#[cfg(any(test, feature = "testing"))]
pub struct MockBackend {
    replies: std::sync::Mutex<std::collections::VecDeque<String>>,
    requests: std::sync::Mutex<Vec<GenerateRequest>>,
    fail_with: std::sync::Mutex<Option<String>>,
}

#[cfg(any(test, feature = "testing"))]
impl MockBackend {
    /// Create a backend that echoes every message.
    pub fn new() -> Self {
        Self {
            replies: std::sync::Mutex::new(std::collections::VecDeque::new()),
            requests: std::sync::Mutex::new(Vec::new()),
            fail_with: std::sync::Mutex::new(None),
        }
    }

    /// Queue a scripted reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }

    /// Create with a list of scripted replies.
    pub fn with_replies(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let backend = Self::new();
        for reply in replies {
            backend.push_reply(reply);
        }
        backend
    }

    /// Make every subsequent call fail with an unavailable error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    /// Requests observed so far.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of generate calls observed.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl ModelBackend for MockBackend {
    async fn generate(
        &self,
        request: GenerateRequest,
        tools: &[Arc<dyn ToolHandle>],
    ) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(crate::error::LlmError::unavailable(message));
        }

        let reply = self.replies.lock().unwrap().pop_front();
        let reply = match reply {
            Some(r) => r,
            None => format!("echo: {}", request.message),
        };

        // Scripted tool invocation: "call:<tool>:<json-args>"
        if let Some(rest) = reply.strip_prefix("call:") {
            let (tool_name, args) = rest.split_once(':').unwrap_or((rest, "{}"));
            let handle = find_handle(tools, tool_name).ok_or_else(|| {
                crate::error::LlmError::invalid_response(format!(
                    "mock reply references unknown tool '{tool_name}'"
                ))
            })?;
            let args: serde_json::Value = serde_json::from_str(args)?;
            return match handle.invoke(args).await {
                Ok(output) => Ok(output),
                Err(e) => Ok(format!("tool error: {e}")),
            };
        }

        Ok(reply)
    }

    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

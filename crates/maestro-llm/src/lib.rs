//! Model backend abstraction for Maestro.
//!
//! The orchestration core talks to language models exclusively through the
//! [`ModelBackend`] trait: one call per agent turn, taking the instruction,
//! prior history, the new message, and the resolved [`ToolHandle`]s, and
//! returning the final reply text.
//!
//! Backends:
//! - [`GeminiBackend`]: Google Generative Language API with a bounded
//!   function-calling loop
//! - `MockBackend` (behind the `testing` feature): scripted replies for
//!   downstream tests

pub mod backend;
pub mod error;
pub mod gemini;
pub mod types;

pub use backend::{ModelBackend, ToolHandle, find_handle};
pub use error::{LlmError, Result, ToolInvokeError};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use types::{GenerateRequest, ToolDefinition};

#[cfg(any(test, feature = "testing"))]
pub use backend::MockBackend;

//! Agent orchestration core.
//!
//! Registry, composition, sessions, execution, and evaluation for
//! Maestro agents. The model backend is injected; everything here is
//! backend-agnostic orchestration.

pub mod composer;
pub mod engine;
pub mod error;
pub mod eval;
pub mod registry;
pub mod session;
pub mod tools;

pub use composer::{ComposeRequest, Composer};
pub use engine::{ExecutionEngine, RunOutcome};
pub use error::{AgentError, Result};
pub use eval::evaluate;
pub use registry::{AgentRegistry, SUPPORTED_MODELS, validate_model};
pub use session::{SessionLease, SessionStore};
pub use tools::{BuiltinTools, WebToolConfig};

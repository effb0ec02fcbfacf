//! Shared types for the Maestro agent orchestration server.
//!
//! This crate defines the data model that every other Maestro crate
//! builds on:
//! - [`AgentDefinition`]: a named, immutable agent configuration
//! - [`ToolBinding`]: the tagged union of tool references an agent may carry
//! - [`Turn`] / [`Role`]: one entry in a session's conversation history
//! - [`EvaluationReport`]: the result of a batch evaluation run

mod agent;
mod conversation;
mod report;

pub use agent::{AgentDefinition, AgentSummary, ProxyId, ToolBinding};
pub use conversation::{Role, Turn};
pub use report::{CaseResult, EvaluationReport, TestCase};

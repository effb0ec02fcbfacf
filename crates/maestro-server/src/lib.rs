//! Protocol host for Maestro.
//!
//! This crate exposes the agent registry, execution engine, and proxy
//! manager as a tool catalogue served over newline-delimited JSON-RPC
//! on stdio.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use maestro_llm::GeminiBackend;
//! use maestro_server::{AppState, ServerConfig, serve_stdio};
//!
//! let backend = Arc::new(GeminiBackend::from_env()?);
//! let state = Arc::new(AppState::new(backend, ServerConfig::default()));
//! serve_stdio(state).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod params;
pub mod serve;
pub mod state;
pub mod version;

pub use catalog::{CatalogueEntry, catalogue};
pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use error::{ErrorBody, Result, ServerError};
pub use serve::serve_stdio;
pub use state::AppState;
pub use version::{SERVER_NAME, SERVER_VERSION};

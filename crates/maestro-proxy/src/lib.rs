//! Proxy layer for external tool servers.
//!
//! A proxy is a child process that exposes tools over Content-Length framed
//! JSON-RPC on its stdio. The [`ProxyManager`] launches children, drives the
//! initialize handshake, applies tool filters, and forwards invocations with
//! timeouts and liveness tracking.
//!
//! # Example
//!
//! ```no_run
//! use maestro_proxy::{LaunchSpec, ProxyManager};
//!
//! # async fn example() -> maestro_proxy::Result<()> {
//! let manager = ProxyManager::default();
//! let outcome = manager
//!     .attach(LaunchSpec::new("my-tool-server"), None)
//!     .await?;
//! let text = manager
//!     .invoke(outcome.proxy_id, "lookup", serde_json::json!({"q": "rust"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod transport;

pub use client::{LaunchSpec, ProxyClient};
pub use error::{ProxyError, Result};
pub use manager::{AttachOutcome, ProxyManager, ProxyManagerConfig, ProxyState, ProxySummary};
pub use protocol::{CallToolResult, PeerInfo, RemoteTool};

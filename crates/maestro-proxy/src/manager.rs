//! Supervisor for proxied tool servers.
//!
//! The manager owns every proxy child the host has attached: it launches
//! them, runs the handshake under a deadline, tracks liveness, and forwards
//! tool calls with a per-invocation timeout. Blocking pipe io runs on the
//! tokio blocking pool so the async callers never stall.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task;

use maestro_types::ProxyId;

use crate::client::{LaunchSpec, ProxyClient};
use crate::error::{ProxyError, Result};
use crate::protocol::{JsonRpcError, PeerInfo, RemoteTool};

/// Timeouts applied to every proxy the manager supervises.
#[derive(Debug, Clone)]
pub struct ProxyManagerConfig {
    /// Deadline for spawn plus initialize plus the first tools/list.
    pub handshake_timeout: Duration,
    /// Deadline for a single tools/call round trip.
    pub invoke_timeout: Duration,
}

impl Default for ProxyManagerConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            invoke_timeout: Duration::from_secs(30),
        }
    }
}

/// Liveness of one attached proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyState {
    /// Launched, handshake in flight.
    Starting,
    /// Handshake complete, serving calls.
    Ready,
    /// The channel broke; no further calls are attempted.
    Failed,
    /// Shut down by request.
    Closed,
}

impl fmt::Display for ProxyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Result of attaching a proxy.
#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub proxy_id: ProxyId,
    pub server: PeerInfo,
    /// Tools exposed after applying the filter.
    pub tools: Vec<RemoteTool>,
    /// True when a filter was given and nothing the child advertises
    /// matched it. The child stays attached with zero exposed tools.
    pub no_matching_tools: bool,
}

/// Snapshot of one attached proxy for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct ProxySummary {
    pub proxy_id: ProxyId,
    pub command: String,
    pub state: ProxyState,
    pub tools: Vec<String>,
}

struct ProxyEntry {
    id: ProxyId,
    client: Arc<ProxyClient>,
    state: StdMutex<ProxyState>,
    tools: Vec<RemoteTool>,
}

impl ProxyEntry {
    fn state(&self) -> ProxyState {
        self.state.lock().map(|g| *g).unwrap_or(ProxyState::Failed)
    }

    fn set_state(&self, next: ProxyState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = next;
        }
    }

    fn exposes(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool)
    }
}

/// Supervises all attached proxy children.
pub struct ProxyManager {
    config: ProxyManagerConfig,
    entries: RwLock<HashMap<ProxyId, Arc<ProxyEntry>>>,
}

impl Default for ProxyManager {
    fn default() -> Self {
        Self::new(ProxyManagerConfig::default())
    }
}

impl ProxyManager {
    pub fn new(config: ProxyManagerConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Launch a child, run the handshake under the configured deadline, and
    /// register it. On handshake timeout the child is killed and nothing is
    /// registered.
    pub async fn attach(
        &self,
        spec: LaunchSpec,
        tool_filter: Option<Vec<String>>,
    ) -> Result<AttachOutcome> {
        let command = spec.command.clone();

        let launch_spec = spec;
        let client = task::spawn_blocking(move || ProxyClient::launch(launch_spec))
            .await
            .map_err(|e| ProxyError::protocol(format!("launch task panicked: {}", e)))??;
        let client = Arc::new(client);
        let killer = client.killer();

        let handshake = {
            let client = Arc::clone(&client);
            task::spawn_blocking(move || -> Result<(PeerInfo, Vec<RemoteTool>)> {
                let info = client.initialize()?;
                let tools = client.list_tools()?;
                Ok((info, tools))
            })
        };

        let timeout = self.config.handshake_timeout;
        let (server, advertised) = match tokio::time::timeout(timeout, handshake).await {
            Ok(joined) => joined
                .map_err(|e| ProxyError::protocol(format!("handshake task panicked: {}", e)))?
                .inspect_err(|_| killer.kill())?,
            Err(_) => {
                // Unblocks the abandoned handshake thread via pipe EOF.
                killer.kill();
                return Err(ProxyError::HandshakeTimeout {
                    command,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        let (tools, no_matching_tools) = match &tool_filter {
            Some(filter) => {
                let kept: Vec<RemoteTool> = advertised
                    .iter()
                    .filter(|t| filter.iter().any(|f| f == &t.name))
                    .cloned()
                    .collect();
                let empty = kept.is_empty();
                if empty {
                    tracing::warn!(
                        command = %command,
                        filter = ?filter,
                        advertised = advertised.len(),
                        "tool filter matched nothing; proxy attached with no exposed tools"
                    );
                }
                (kept, empty)
            }
            None => (advertised, false),
        };

        let id = ProxyId::new();
        let entry = Arc::new(ProxyEntry {
            id,
            client,
            state: StdMutex::new(ProxyState::Ready),
            tools: tools.clone(),
        });

        self.entries.write().await.insert(id, entry);

        tracing::info!(
            proxy_id = %id,
            command = %command,
            server = %server.name,
            tool_count = tools.len(),
            "proxy attached"
        );

        Ok(AttachOutcome {
            proxy_id: id,
            server,
            tools,
            no_matching_tools,
        })
    }

    async fn entry(&self, id: ProxyId) -> Result<Arc<ProxyEntry>> {
        self.entries
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ProxyError::NotFound(id))
    }

    /// Forward a tool call to an attached proxy.
    ///
    /// Calls against a proxy that is not `Ready` fail fast without touching
    /// the child. A timed-out call abandons only that call; the child stays
    /// attached and later calls may still succeed.
    pub async fn invoke(&self, id: ProxyId, tool: &str, arguments: Value) -> Result<String> {
        let entry = self.entry(id).await?;

        let state = entry.state();
        if state != ProxyState::Ready {
            return Err(ProxyError::ProxyUnavailable {
                id,
                state: state.to_string(),
            });
        }
        if !entry.exposes(tool) {
            return Err(ProxyError::UnknownTool {
                id,
                tool: tool.to_string(),
            });
        }

        let call = {
            let client = Arc::clone(&entry.client);
            let tool = tool.to_string();
            task::spawn_blocking(move || client.call_tool(&tool, Some(arguments)))
        };

        let timeout = self.config.invoke_timeout;
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(joined) => {
                joined.map_err(|e| ProxyError::protocol(format!("invoke task panicked: {}", e)))?
            }
            Err(_) => {
                tracing::warn!(proxy_id = %id, tool = %tool, timeout_ms = timeout.as_millis() as u64, "proxied tool call timed out");
                return Err(ProxyError::ProxyTimeout {
                    tool: tool.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        match result {
            Ok(call) if call.is_error() => Err(ProxyError::Server {
                code: JsonRpcError::INTERNAL_ERROR,
                message: call.text(),
            }),
            Ok(call) => Ok(call.text()),
            Err(e) => {
                if e.is_fatal() {
                    entry.set_state(ProxyState::Failed);
                    tracing::error!(proxy_id = %id, error = %e, "proxy channel failed");
                }
                Err(e)
            }
        }
    }

    /// Tools exposed by one proxy.
    pub async fn tools(&self, id: ProxyId) -> Result<Vec<RemoteTool>> {
        Ok(self.entry(id).await?.tools.clone())
    }

    /// True when the proxy exists and exposes the named tool.
    pub async fn exposes(&self, id: ProxyId, tool: &str) -> bool {
        match self.entry(id).await {
            Ok(entry) => entry.exposes(tool),
            Err(_) => false,
        }
    }

    /// Current state of one proxy.
    pub async fn state(&self, id: ProxyId) -> Result<ProxyState> {
        Ok(self.entry(id).await?.state())
    }

    /// Snapshot of every attached proxy.
    pub async fn list(&self) -> Vec<ProxySummary> {
        let entries = self.entries.read().await;
        let mut summaries: Vec<ProxySummary> = entries
            .values()
            .map(|e| ProxySummary {
                proxy_id: e.id,
                command: e.client.command().to_string(),
                state: e.state(),
                tools: e.tools.iter().map(|t| t.name.clone()).collect(),
            })
            .collect();
        summaries.sort_by(|a, b| a.command.cmp(&b.command));
        summaries
    }

    /// Kill one proxy child and remove it from the registry.
    pub async fn close(&self, id: ProxyId) -> Result<()> {
        let entry = {
            let mut entries = self.entries.write().await;
            entries.remove(&id).ok_or(ProxyError::NotFound(id))?
        };
        entry.set_state(ProxyState::Closed);
        let client = Arc::clone(&entry.client);
        task::spawn_blocking(move || client.shutdown())
            .await
            .map_err(|e| ProxyError::protocol(format!("shutdown task panicked: {}", e)))?;
        tracing::info!(proxy_id = %id, "proxy closed");
        Ok(())
    }

    /// Kill every attached proxy. Used on host shutdown.
    pub async fn close_all(&self) {
        let entries: Vec<Arc<ProxyEntry>> = {
            let mut map = self.entries.write().await;
            map.drain().map(|(_, e)| e).collect()
        };
        for entry in entries {
            entry.set_state(ProxyState::Closed);
            let client = Arc::clone(&entry.client);
            let id = entry.id;
            let _ = task::spawn_blocking(move || client.shutdown()).await;
            tracing::info!(proxy_id = %id, "proxy closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoke_unknown_proxy_is_not_found() {
        let manager = ProxyManager::default();
        let id = ProxyId::new();
        let err = manager
            .invoke(id, "anything", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::NotFound(_)));
    }

    #[tokio::test]
    async fn attach_nonexistent_command_is_launch_failed() {
        let manager = ProxyManager::default();
        let err = manager
            .attach(LaunchSpec::new("no-such-proxy-binary-24680"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::LaunchFailed { .. }));
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn close_unknown_proxy_is_not_found() {
        let manager = ProxyManager::default();
        let err = manager.close(ProxyId::new()).await.unwrap_err();
        assert!(matches!(err, ProxyError::NotFound(_)));
    }

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(ProxyState::Ready.to_string(), "ready");
        assert_eq!(ProxyState::Failed.to_string(), "failed");
    }
}

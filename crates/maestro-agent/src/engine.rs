//! Agent execution.
//!
//! A run resolves the agent's symbolic tool bindings into callable
//! handles, leases the session, and drives one backend generation. The
//! backend owns any tool-use looping; the engine only wires handles in
//! and records the exchange.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use maestro_llm::{GenerateRequest, ModelBackend, ToolHandle, ToolInvokeError};
use maestro_proxy::{ProxyManager, RemoteTool};
use maestro_types::{AgentDefinition, ProxyId, ToolBinding, Turn};

use crate::error::{AgentError, Result};
use crate::registry::AgentRegistry;
use crate::session::SessionStore;
use crate::tools::BuiltinTools;

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub reply: String,
    /// Session the exchange was recorded under; newly generated when the
    /// caller passed none.
    pub session_id: String,
    /// Total turns in the session after this run.
    pub turn_count: usize,
}

pub struct ExecutionEngine {
    registry: Arc<AgentRegistry>,
    sessions: Arc<SessionStore>,
    proxies: Arc<ProxyManager>,
    backend: Arc<dyn ModelBackend>,
    builtins: Arc<BuiltinTools>,
}

impl ExecutionEngine {
    pub fn new(
        registry: Arc<AgentRegistry>,
        sessions: Arc<SessionStore>,
        proxies: Arc<ProxyManager>,
        backend: Arc<dyn ModelBackend>,
        builtins: Arc<BuiltinTools>,
    ) -> Self {
        Self {
            registry,
            sessions,
            proxies,
            backend,
            builtins,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Run one message against an agent.
    ///
    /// Binding resolution happens before the session is touched, so a
    /// misconfigured agent aborts without leaving any partial turns. On
    /// backend failure the user turn is rolled back for the same reason.
    pub async fn run(
        self: &Arc<Self>,
        agent_name: &str,
        message: &str,
        session_id: Option<String>,
    ) -> Result<RunOutcome> {
        let def = self.registry.get(agent_name).await?;
        let tools = self.resolve_bindings(&def).await?;

        let mut lease = self.sessions.lease(session_id).await?;

        tracing::info!(
            agent = %agent_name,
            session_id = %lease.id(),
            tools = tools.len(),
            "running agent"
        );

        let request = GenerateRequest {
            model: def.model.clone(),
            instruction: def.instruction.clone(),
            history: lease.turns().to_vec(),
            message: message.to_string(),
        };

        lease.push(Turn::user(message));

        match self.backend.generate(request, &tools).await {
            Ok(reply) => {
                lease.push(Turn::agent(&reply));
                Ok(RunOutcome {
                    reply,
                    session_id: lease.id().to_string(),
                    turn_count: lease.len(),
                })
            }
            Err(e) => {
                // No garbled half-exchange left behind.
                lease.pop();
                tracing::warn!(agent = %agent_name, error = %e, "backend failed, user turn rolled back");
                Err(AgentError::Backend(e))
            }
        }
    }

    /// Resolve every binding on a definition to a callable handle.
    async fn resolve_bindings(
        self: &Arc<Self>,
        def: &AgentDefinition,
    ) -> Result<Vec<Arc<dyn ToolHandle>>> {
        let mut handles: Vec<Arc<dyn ToolHandle>> = Vec::with_capacity(def.tools.len());

        for binding in &def.tools {
            let handle: Arc<dyn ToolHandle> = match binding {
                ToolBinding::BuiltIn { name } => {
                    self.builtins.get(name).ok_or_else(|| {
                        AgentError::tool_resolution(
                            &def.name,
                            binding.label(),
                            "no such built-in tool",
                        )
                    })?
                }
                ToolBinding::Proxied { proxy_id, tool } => {
                    let remote = self
                        .proxies
                        .tools(*proxy_id)
                        .await
                        .map_err(|e| {
                            AgentError::tool_resolution(&def.name, binding.label(), e.to_string())
                        })?
                        .into_iter()
                        .find(|t| &t.name == tool)
                        .ok_or_else(|| {
                            AgentError::tool_resolution(
                                &def.name,
                                binding.label(),
                                "proxy does not expose this tool",
                            )
                        })?;
                    Arc::new(ProxiedToolHandle {
                        proxies: Arc::clone(&self.proxies),
                        proxy_id: *proxy_id,
                        tool: remote,
                    })
                }
                ToolBinding::SubAgent { agent } => {
                    let sub = self.registry.get(agent).await.map_err(|_| {
                        AgentError::tool_resolution(
                            &def.name,
                            binding.label(),
                            "sub-agent is not registered",
                        )
                    })?;
                    Arc::new(SubAgentHandle {
                        engine: Arc::clone(self),
                        agent: sub.name.clone(),
                        description: if sub.description.is_empty() {
                            format!("Delegate a request to the '{}' agent", sub.name)
                        } else {
                            format!("Delegate to '{}': {}", sub.name, sub.description)
                        },
                    })
                }
            };
            handles.push(handle);
        }

        Ok(handles)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxied tools as handles
// ─────────────────────────────────────────────────────────────────────────────

struct ProxiedToolHandle {
    proxies: Arc<ProxyManager>,
    proxy_id: ProxyId,
    tool: RemoteTool,
}

#[async_trait]
impl ToolHandle for ProxiedToolHandle {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or("")
    }

    fn parameters(&self) -> Value {
        self.tool
            .input_schema
            .clone()
            .unwrap_or_else(|| json!({ "type": "object", "properties": {} }))
    }

    async fn invoke(&self, args: Value) -> std::result::Result<String, ToolInvokeError> {
        self.proxies
            .invoke(self.proxy_id, &self.tool.name, args)
            .await
            .map_err(|e| ToolInvokeError::new(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sub-agents as tools
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps a sub-agent as a tool the coordinator's backend can call.
/// Every invocation runs in a fresh session; delegation history lives in
/// the coordinator's transcript, not the sub-agent's.
struct SubAgentHandle {
    engine: Arc<ExecutionEngine>,
    agent: String,
    description: String,
}

#[async_trait]
impl ToolHandle for SubAgentHandle {
    fn name(&self) -> &str {
        &self.agent
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "request": {
                    "type": "string",
                    "description": "The request to hand to the sub-agent"
                }
            },
            "required": ["request"]
        })
    }

    async fn invoke(&self, args: Value) -> std::result::Result<String, ToolInvokeError> {
        let request = args
            .get("request")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolInvokeError::new("missing 'request' argument"))?;

        let outcome = self
            .engine
            .run(&self.agent, request, None)
            .await
            .map_err(|e| ToolInvokeError::new(format!("sub-agent '{}': {}", self.agent, e)))?;
        Ok(outcome.reply)
    }
}

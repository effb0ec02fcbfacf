//! Agent definitions and tool bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Proxy ID
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for an attached tool proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyId(Uuid);

impl ProxyId {
    /// Create a new random proxy ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProxyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProxyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProxyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Bindings
// ─────────────────────────────────────────────────────────────────────────────

/// A reference to a tool an agent is allowed to use.
///
/// Bindings are stored symbolically in the [`AgentDefinition`] and resolved
/// to callable handles at execution time. Resolution failure is a
/// configuration error, never a crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolBinding {
    /// A built-in tool implemented by this server (e.g. `search_web`).
    BuiltIn {
        /// Name of the built-in tool.
        name: String,
    },
    /// Another registered agent, exposed to the coordinator as a tool.
    SubAgent {
        /// Name of the sub-agent in the registry.
        agent: String,
    },
    /// A tool advertised by an external proxied tool server.
    Proxied {
        /// ID of the proxy handle that owns the connection.
        proxy_id: ProxyId,
        /// Remote tool name as advertised by the proxy.
        tool: String,
    },
}

impl ToolBinding {
    /// Create a built-in binding.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::BuiltIn { name: name.into() }
    }

    /// Create a sub-agent binding.
    pub fn sub_agent(agent: impl Into<String>) -> Self {
        Self::SubAgent {
            agent: agent.into(),
        }
    }

    /// Create a proxied binding.
    pub fn proxied(proxy_id: ProxyId, tool: impl Into<String>) -> Self {
        Self::Proxied {
            proxy_id,
            tool: tool.into(),
        }
    }

    /// A short human-readable label for error messages.
    pub fn label(&self) -> String {
        match self {
            Self::BuiltIn { name } => format!("builtin:{name}"),
            Self::SubAgent { agent } => format!("agent:{agent}"),
            Self::Proxied { proxy_id, tool } => format!("proxy:{proxy_id}:{tool}"),
        }
    }

    /// Returns true if this binding references a sub-agent.
    pub fn is_sub_agent(&self) -> bool {
        matches!(self, Self::SubAgent { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent Definition
// ─────────────────────────────────────────────────────────────────────────────

/// A named agent configuration.
///
/// The name is immutable after creation and unique within the registry.
/// Definitions are owned exclusively by the registry; clients only ever see
/// clones or summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique agent name.
    pub name: String,
    /// System instruction driving the agent's behavior.
    pub instruction: String,
    /// Free-text description of what the agent does.
    #[serde(default)]
    pub description: String,
    /// Model identifier, validated against the server's allow-list.
    pub model: String,
    /// Ordered tool bindings. Order is preserved; it affects how the
    /// backend is informed about available tools.
    #[serde(default)]
    pub tools: Vec<ToolBinding>,
    /// When the definition was created.
    pub created_at: DateTime<Utc>,
}

impl AgentDefinition {
    /// Create a new definition with the current timestamp.
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            description: String::new(),
            model: model.into(),
            tools: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the tool bindings.
    pub fn with_tools(mut self, tools: Vec<ToolBinding>) -> Self {
        self.tools = tools;
        self
    }

    /// Names of all sub-agents this definition references.
    pub fn sub_agent_names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter_map(|t| match t {
                ToolBinding::SubAgent { agent } => Some(agent.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether this definition is a multi-agent coordinator (has at least
    /// one sub-agent binding).
    pub fn is_coordinator(&self) -> bool {
        self.tools.iter().any(ToolBinding::is_sub_agent)
    }

    /// Produce the summary view returned by list operations.
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            model: self.model.clone(),
            description: self.description.clone(),
            tool_count: self.tools.len(),
            is_coordinator: self.is_coordinator(),
            created_at: self.created_at,
        }
    }
}

/// Compact view of an agent definition for list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent name.
    pub name: String,
    /// Model identifier.
    pub model: String,
    /// Free-text description.
    pub description: String,
    /// Number of tool bindings.
    pub tool_count: usize,
    /// Whether the agent coordinates sub-agents.
    pub is_coordinator: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_serialization_tagged() {
        let binding = ToolBinding::builtin("search_web");
        let json = serde_json::to_string(&binding).unwrap();
        assert!(json.contains("\"kind\":\"built_in\""));
        assert!(json.contains("search_web"));

        let restored: ToolBinding = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, binding);
    }

    #[test]
    fn test_binding_labels() {
        assert_eq!(ToolBinding::builtin("x").label(), "builtin:x");
        assert_eq!(ToolBinding::sub_agent("faq").label(), "agent:faq");

        let id = ProxyId::new();
        let label = ToolBinding::proxied(id, "query").label();
        assert!(label.starts_with("proxy:"));
        assert!(label.ends_with(":query"));
    }

    #[test]
    fn test_definition_round_trip() {
        let def = AgentDefinition::new("faq", "Answer FAQs", "gemini-2.0-flash")
            .with_description("FAQ bot")
            .with_tools(vec![ToolBinding::builtin("search_web")]);

        let json = serde_json::to_string(&def).unwrap();
        let restored: AgentDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, def);
    }

    #[test]
    fn test_sub_agent_names_preserve_order() {
        let def = AgentDefinition::new("coord", "Coordinate", "gemini-2.0-flash").with_tools(vec![
            ToolBinding::sub_agent("beta"),
            ToolBinding::builtin("search_web"),
            ToolBinding::sub_agent("alpha"),
        ]);

        assert_eq!(def.sub_agent_names(), vec!["beta", "alpha"]);
        assert!(def.is_coordinator());
    }

    #[test]
    fn test_summary() {
        let def = AgentDefinition::new("faq", "Answer FAQs", "gemini-1.5-pro")
            .with_tools(vec![ToolBinding::builtin("load_webpage_content")]);
        let summary = def.summary();
        assert_eq!(summary.name, "faq");
        assert_eq!(summary.tool_count, 1);
        assert!(!summary.is_coordinator);
    }

    #[test]
    fn test_proxy_id_parse() {
        let id = ProxyId::new();
        let parsed: ProxyId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        assert!("not-a-uuid".parse::<ProxyId>().is_err());
    }
}

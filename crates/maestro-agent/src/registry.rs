//! In-memory agent registry.
//!
//! Definitions are validated on the way in: the model id must be on the
//! supported list, built-in bindings must name tools the host actually
//! has, and sub-agent bindings only enter through the composer.

use std::collections::HashMap;

use tokio::sync::RwLock;

use maestro_types::{AgentDefinition, AgentSummary, ToolBinding};

use crate::error::{AgentError, Result};

/// Model ids the registry accepts.
pub const SUPPORTED_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"];

/// Check a model id against the supported list.
pub fn validate_model(model: &str) -> Result<()> {
    if SUPPORTED_MODELS.contains(&model) {
        Ok(())
    } else {
        Err(AgentError::InvalidModel {
            model: model.to_string(),
            supported: SUPPORTED_MODELS.join(", "),
        })
    }
}

/// Registry of agent definitions, keyed by name.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentDefinition>>,
    /// Names of built-in tools available for `BuiltIn` bindings.
    builtin_names: Vec<String>,
}

impl AgentRegistry {
    pub fn new(builtin_names: Vec<String>) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            builtin_names,
        }
    }

    fn validate(&self, def: &AgentDefinition, allow_sub_agents: bool) -> Result<()> {
        if def.name.trim().is_empty() {
            return Err(AgentError::invalid_definition("agent name is empty"));
        }
        validate_model(&def.model)?;

        for binding in &def.tools {
            match binding {
                ToolBinding::BuiltIn { name } => {
                    if !self.builtin_names.iter().any(|b| b == name) {
                        return Err(AgentError::invalid_definition(format!(
                            "unknown built-in tool '{}' (available: {})",
                            name,
                            self.builtin_names.join(", ")
                        )));
                    }
                }
                ToolBinding::SubAgent { agent } if !allow_sub_agents => {
                    return Err(AgentError::invalid_definition(format!(
                        "sub-agent binding '{}' is only valid in a composed system",
                        agent
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn insert(
        &self,
        def: AgentDefinition,
        overwrite: bool,
        allow_sub_agents: bool,
    ) -> Result<()> {
        self.validate(&def, allow_sub_agents)?;

        let mut agents = self.agents.write().await;
        if !overwrite && agents.contains_key(&def.name) {
            return Err(AgentError::AlreadyExists(def.name));
        }

        tracing::info!(
            agent = %def.name,
            model = %def.model,
            tools = def.tools.len(),
            overwrite,
            "registered agent"
        );
        agents.insert(def.name.clone(), def);
        Ok(())
    }

    /// Register a plain agent. Sub-agent bindings are rejected; use the
    /// composer for those.
    pub async fn create(&self, def: AgentDefinition, overwrite: bool) -> Result<()> {
        self.insert(def, overwrite, false).await
    }

    /// Register a composed coordinator. Only the composer calls this,
    /// after its cycle and existence checks.
    pub(crate) async fn create_coordinator(
        &self,
        def: AgentDefinition,
        overwrite: bool,
    ) -> Result<()> {
        self.insert(def, overwrite, true).await
    }

    /// Fetch one definition by name.
    pub async fn get(&self, name: &str) -> Result<AgentDefinition> {
        self.agents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::AgentNotFound(name.to_string()))
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.agents.read().await.contains_key(name)
    }

    /// Summaries of every registered agent, sorted by name.
    pub async fn list(&self) -> Vec<AgentSummary> {
        let agents = self.agents.read().await;
        let mut summaries: Vec<AgentSummary> = agents.values().map(|d| d.summary()).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Remove an agent. Sessions that reference it keep their history.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let mut agents = self.agents.write().await;
        if agents.remove(name).is_none() {
            return Err(AgentError::AgentNotFound(name.to_string()));
        }
        tracing::info!(agent = %name, "deleted agent");
        Ok(())
    }

    /// Replace an existing definition in place. Used when attaching proxy
    /// tools to an agent; the name must already exist.
    pub async fn update(&self, def: AgentDefinition) -> Result<()> {
        self.validate(&def, true)?;
        let mut agents = self.agents.write().await;
        if !agents.contains_key(&def.name) {
            return Err(AgentError::AgentNotFound(def.name));
        }
        agents.insert(def.name.clone(), def);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

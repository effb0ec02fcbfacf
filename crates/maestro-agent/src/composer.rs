//! Multi-agent composition.
//!
//! A composed system is a coordinator agent whose tool bindings all point
//! at previously registered sub-agents. Composition is all-or-nothing: if
//! any referenced sub-agent is missing, or the coordinator's own name is
//! reachable through existing delegation chains, nothing is registered.

use std::collections::HashSet;
use std::sync::Arc;

use maestro_types::{AgentDefinition, ToolBinding};

use crate::error::{AgentError, Result};
use crate::registry::AgentRegistry;

/// Inputs for composing a coordinator.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub name: String,
    pub instruction: String,
    pub description: String,
    pub model: String,
    /// Sub-agent names, in the order the coordinator should see them.
    pub sub_agents: Vec<String>,
    pub overwrite: bool,
}

pub struct Composer {
    registry: Arc<AgentRegistry>,
}

impl Composer {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// Compose and register a coordinator agent.
    pub async fn compose(&self, req: ComposeRequest) -> Result<AgentDefinition> {
        if req.sub_agents.is_empty() {
            return Err(AgentError::invalid_definition(
                "a multi-agent system needs at least one sub-agent",
            ));
        }

        // All referenced sub-agents must already exist; collect every
        // missing name rather than failing on the first.
        let mut missing = Vec::new();
        for name in &req.sub_agents {
            if !self.registry.contains(name).await {
                missing.push(name.clone());
            }
        }
        if !missing.is_empty() {
            return Err(AgentError::Composition { missing });
        }

        // The coordinator's name must not be reachable from any sub-agent
        // through existing delegation chains, itself included.
        for sub in &req.sub_agents {
            if sub == &req.name {
                return Err(AgentError::CyclicComposition {
                    agent: req.name.clone(),
                    through: sub.clone(),
                });
            }
            if self.reaches(sub, &req.name).await? {
                return Err(AgentError::CyclicComposition {
                    agent: req.name.clone(),
                    through: sub.clone(),
                });
            }
        }

        let bindings: Vec<ToolBinding> = req
            .sub_agents
            .iter()
            .map(|name| ToolBinding::sub_agent(name.clone()))
            .collect();

        let def = AgentDefinition::new(&req.name, &req.instruction, &req.model)
            .with_description(&req.description)
            .with_tools(bindings);

        self.registry
            .create_coordinator(def.clone(), req.overwrite)
            .await?;

        tracing::info!(
            coordinator = %req.name,
            sub_agents = ?req.sub_agents,
            "composed multi-agent system"
        );
        Ok(def)
    }

    /// Depth-first walk of sub-agent bindings from `start`, looking for
    /// `target`. Dangling references are skipped; they fail later at
    /// resolution time, not here.
    async fn reaches(&self, start: &str, target: &str) -> Result<bool> {
        let mut stack = vec![start.to_string()];
        let mut seen = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == target {
                return Ok(true);
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Ok(def) = self.registry.get(&current).await {
                for sub in def.sub_agent_names() {
                    stack.push(sub.to_string());
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<AgentRegistry>, Composer) {
        let registry = Arc::new(AgentRegistry::new(vec!["search_web".to_string()]));
        let composer = Composer::new(Arc::clone(&registry));
        (registry, composer)
    }

    async fn register(registry: &AgentRegistry, name: &str) {
        registry
            .create(
                AgentDefinition::new(name, "instruction", "gemini-2.0-flash"),
                false,
            )
            .await
            .unwrap();
    }

    fn request(name: &str, subs: &[&str]) -> ComposeRequest {
        ComposeRequest {
            name: name.to_string(),
            instruction: "Coordinate the team.".to_string(),
            description: String::new(),
            model: "gemini-2.0-flash".to_string(),
            sub_agents: subs.iter().map(|s| s.to_string()).collect(),
            overwrite: false,
        }
    }

    #[tokio::test]
    async fn compose_registers_coordinator_with_ordered_bindings() {
        let (registry, composer) = setup();
        register(&registry, "researcher").await;
        register(&registry, "writer").await;

        let def = composer
            .compose(request("lead", &["writer", "researcher"]))
            .await
            .unwrap();

        assert!(def.is_coordinator());
        assert_eq!(def.sub_agent_names(), vec!["writer", "researcher"]);
        assert!(registry.contains("lead").await);
    }

    #[tokio::test]
    async fn missing_sub_agents_collected_and_nothing_registered() {
        let (registry, composer) = setup();
        register(&registry, "researcher").await;

        let err = composer
            .compose(request("lead", &["researcher", "ghost", "phantom"]))
            .await
            .unwrap_err();

        match err {
            AgentError::Composition { missing } => {
                assert_eq!(missing, vec!["ghost", "phantom"]);
            }
            other => panic!("expected Composition, got {other}"),
        }
        assert!(!registry.contains("lead").await);
    }

    #[tokio::test]
    async fn self_reference_is_cyclic() {
        let (registry, composer) = setup();
        register(&registry, "lead").await;

        let err = composer
            .compose(ComposeRequest {
                overwrite: true,
                ..request("lead", &["lead"])
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::CyclicComposition { .. }));
    }

    #[tokio::test]
    async fn transitive_cycle_is_rejected() {
        let (registry, composer) = setup();
        register(&registry, "worker").await;
        // inner delegates to worker, outer delegates to inner.
        composer.compose(request("inner", &["worker"])).await.unwrap();
        composer.compose(request("outer", &["inner"])).await.unwrap();

        // Re-registering worker as a coordinator over outer would close
        // the loop worker -> outer -> inner -> worker.
        let err = composer
            .compose(ComposeRequest {
                overwrite: true,
                ..request("worker", &["outer"])
            })
            .await
            .unwrap_err();

        match err {
            AgentError::CyclicComposition { agent, through } => {
                assert_eq!(agent, "worker");
                assert_eq!(through, "outer");
            }
            other => panic!("expected CyclicComposition, got {other}"),
        }
        // worker keeps its original, non-coordinator definition.
        assert!(!registry.get("worker").await.unwrap().is_coordinator());
    }

    #[tokio::test]
    async fn empty_sub_agent_list_is_invalid() {
        let (_registry, composer) = setup();
        let err = composer.compose(request("lead", &[])).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidDefinition(_)));
    }
}

//! Built-in tools available to every agent via `BuiltIn` bindings.

mod web;

pub use web::{LoadWebpageTool, SearchWebTool, WebToolConfig};

use std::sync::Arc;

use maestro_llm::ToolHandle;

/// The host's built-in tool set.
///
/// Constructed once at startup; agents reference members by name through
/// `BuiltIn` bindings and the engine resolves them here.
pub struct BuiltinTools {
    handles: Vec<Arc<dyn ToolHandle>>,
}

impl BuiltinTools {
    pub fn new(config: WebToolConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_default();

        Self {
            handles: vec![
                Arc::new(SearchWebTool::new(client.clone(), config.clone())),
                Arc::new(LoadWebpageTool::new(client, config)),
            ],
        }
    }

    /// Resolve a built-in by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandle>> {
        self.handles.iter().find(|h| h.name() == name).cloned()
    }

    /// Names of every built-in, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name().to_string()).collect()
    }

    /// All handles, for catalogue listings.
    pub fn handles(&self) -> &[Arc<dyn ToolHandle>] {
        &self.handles
    }
}

impl Default for BuiltinTools {
    fn default() -> Self {
        Self::new(WebToolConfig::default())
    }
}

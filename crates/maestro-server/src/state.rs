//! Process-wide application state.
//!
//! Every component lives here, constructed once at startup and shared by
//! reference. There is no module-level mutable state anywhere in the
//! server.

use std::sync::Arc;

use maestro_agent::{
    AgentRegistry, BuiltinTools, Composer, ExecutionEngine, SessionStore,
};
use maestro_llm::ModelBackend;
use maestro_proxy::ProxyManager;

use crate::config::ServerConfig;

pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<AgentRegistry>,
    pub sessions: Arc<SessionStore>,
    pub proxies: Arc<ProxyManager>,
    pub builtins: Arc<BuiltinTools>,
    pub engine: Arc<ExecutionEngine>,
    pub composer: Composer,
}

impl AppState {
    pub fn new(backend: Arc<dyn ModelBackend>, config: ServerConfig) -> Self {
        let builtins = Arc::new(BuiltinTools::new(config.web.clone()));
        let registry = Arc::new(AgentRegistry::new(builtins.names()));
        let sessions = Arc::new(SessionStore::new());
        let proxies = Arc::new(ProxyManager::new(config.proxy_config()));
        let engine = Arc::new(ExecutionEngine::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
            Arc::clone(&proxies),
            backend,
            Arc::clone(&builtins),
        ));
        let composer = Composer::new(Arc::clone(&registry));

        Self {
            config,
            registry,
            sessions,
            proxies,
            builtins,
            engine,
            composer,
        }
    }

    /// Tear down everything that owns OS resources. Called on shutdown.
    pub async fn shutdown(&self) {
        self.proxies.close_all().await;
        tracing::info!("application state torn down");
    }
}

//! Server configuration.

use std::time::Duration;

use maestro_agent::WebToolConfig;
use maestro_proxy::ProxyManagerConfig;

/// Runtime settings for the server, assembled by the binary from CLI
/// flags and environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline for a proxy child's initialize handshake.
    pub proxy_handshake_timeout: Duration,
    /// Deadline for one proxied tool call.
    pub proxy_invoke_timeout: Duration,
    /// Default model assigned when create requests omit one.
    pub default_model: String,
    /// Settings for the built-in web tools.
    pub web: WebToolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            proxy_handshake_timeout: Duration::from_secs(10),
            proxy_invoke_timeout: Duration::from_secs(30),
            default_model: "gemini-2.0-flash".to_string(),
            web: WebToolConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_proxy_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.proxy_handshake_timeout = timeout;
        self
    }

    pub fn with_proxy_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.proxy_invoke_timeout = timeout;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Proxy manager settings derived from this config.
    pub fn proxy_config(&self) -> ProxyManagerConfig {
        ProxyManagerConfig {
            handshake_timeout: self.proxy_handshake_timeout,
            invoke_timeout: self.proxy_invoke_timeout,
        }
    }
}

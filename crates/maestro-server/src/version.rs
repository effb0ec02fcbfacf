//! Server identity and capability report.

use serde_json::{Value, json};

use maestro_agent::SUPPORTED_MODELS;

pub const SERVER_NAME: &str = "maestro";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capabilities advertised by `get_server_version`.
const CAPABILITIES: &[&str] = &[
    "agent_creation",
    "agent_execution",
    "multi_agent_composition",
    "tool_proxying",
    "evaluation",
    "web_tools",
];

/// Body of the `get_server_version` tool.
pub fn version_report() -> Value {
    json!({
        "status": "success",
        "name": SERVER_NAME,
        "version": SERVER_VERSION,
        "components": {
            "registry": SERVER_VERSION,
            "engine": SERVER_VERSION,
            "proxy_manager": SERVER_VERSION,
        },
        "capabilities": CAPABILITIES,
        "supported_models": SUPPORTED_MODELS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_models_and_capabilities() {
        let report = version_report();
        assert_eq!(report["status"], "success");
        assert_eq!(report["name"], "maestro");
        assert!(
            report["supported_models"]
                .as_array()
                .unwrap()
                .contains(&serde_json::json!("gemini-2.0-flash"))
        );
        assert!(
            report["capabilities"]
                .as_array()
                .unwrap()
                .contains(&serde_json::json!("evaluation"))
        );
    }
}

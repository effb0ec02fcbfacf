//! The fixed tool catalogue the server advertises.
//!
//! One entry per remote-callable operation: name, description, and the
//! JSON Schema for its arguments. The catalogue is static; attaching
//! proxies changes what agents can bind, not what the server itself
//! exposes.

use serde::Serialize;
use serde_json::{Value, json};

/// One catalogue entry, in MCP tools/list shape.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogueEntry {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Every tool the server exposes.
pub fn catalogue() -> Vec<CatalogueEntry> {
    vec![
        CatalogueEntry {
            name: "create_adk_agent",
            description: "Create and register a new agent with a name, system instruction, and model.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Unique agent name" },
                    "instruction": { "type": "string", "description": "System instruction for the agent" },
                    "description": { "type": "string", "description": "What the agent does" },
                    "model": { "type": "string", "description": "Model id; defaults to the server's default model" },
                    "tools": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Built-in tool names to bind"
                    },
                    "overwrite": { "type": "boolean", "description": "Replace an existing agent of the same name", "default": false }
                },
                "required": ["name", "instruction"]
            }),
        },
        CatalogueEntry {
            name: "list_adk_agents",
            description: "List all registered agents with summaries.",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        CatalogueEntry {
            name: "get_adk_agent_info",
            description: "Get the full definition of one agent.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent_name": { "type": "string", "description": "Name of the agent" }
                },
                "required": ["agent_name"]
            }),
        },
        CatalogueEntry {
            name: "run_adk_agent",
            description: "Send a message to an agent and return its reply. Pass session_id to continue a conversation.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent_name": { "type": "string", "description": "Name of the agent to run" },
                    "message": { "type": "string", "description": "The user message" },
                    "session_id": { "type": "string", "description": "Session to continue; omitted starts a new one" }
                },
                "required": ["agent_name", "message"]
            }),
        },
        CatalogueEntry {
            name: "create_multi_agent_system",
            description: "Register a coordinator agent that delegates to previously created sub-agents.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "coordinator_name": { "type": "string", "description": "Coordinator name" },
                    "coordinator_instruction": { "type": "string", "description": "System instruction for the coordinator" },
                    "sub_agents": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Names of existing agents to delegate to, in order"
                    },
                    "description": { "type": "string" },
                    "model": { "type": "string" },
                    "overwrite": { "type": "boolean", "default": false }
                },
                "required": ["coordinator_name", "coordinator_instruction", "sub_agents"]
            }),
        },
        CatalogueEntry {
            name: "add_mcp_tools_to_agent",
            description: "Launch an external MCP tool server and bind its tools to an agent.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent_name": { "type": "string", "description": "Agent receiving the tools" },
                    "mcp_server_command": { "type": "string", "description": "Executable to launch" },
                    "mcp_server_args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Arguments for the executable"
                    },
                    "tool_filter": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only expose these tool names; omit for all"
                    }
                },
                "required": ["agent_name", "mcp_server_command", "mcp_server_args"]
            }),
        },
        CatalogueEntry {
            name: "evaluate_adk_agent",
            description: "Run test cases against an agent and report pass/fail per case.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent_name": { "type": "string", "description": "Agent to evaluate" },
                    "test_cases": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "input": { "type": "string" },
                                "expected_output": { "type": "string" }
                            },
                            "required": ["input", "expected_output"]
                        },
                        "description": "Cases run in order, each in a fresh session"
                    }
                },
                "required": ["agent_name", "test_cases"]
            }),
        },
        CatalogueEntry {
            name: "list_available_tools",
            description: "List built-in tools and every tool exposed by attached proxies.",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        CatalogueEntry {
            name: "search_web",
            description: "Search the web and return result titles, URLs, and snippets.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The search query" },
                    "num_results": { "type": "integer", "description": "Number of results to return, capped by the server's maximum", "default": 5 }
                },
                "required": ["query"]
            }),
        },
        CatalogueEntry {
            name: "load_webpage_content",
            description: "Fetch a URL and return its readable text content.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "The HTTP or HTTPS URL to load" }
                },
                "required": ["url"]
            }),
        },
        CatalogueEntry {
            name: "get_adk_documentation",
            description: "Get usage documentation for a topic: agents, tools, multi_agent, evaluation, or sessions.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "Documentation topic" }
                },
                "required": ["topic"]
            }),
        },
        CatalogueEntry {
            name: "get_server_version",
            description: "Report server name, version, capabilities, and supported models.",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
    ]
}

/// Look up one entry by name.
pub fn entry(name: &str) -> Option<CatalogueEntry> {
    catalogue().into_iter().find(|e| e.name == name)
}

//! Request dispatch.
//!
//! Routes a validated tools/call to the owning component and shapes the
//! response. Every success body carries `"status": "success"`; failures
//! are classified by [`crate::error::ServerError`] before encoding.

use std::sync::Arc;

use serde_json::{Value, json};

use maestro_agent::{ComposeRequest, evaluate};
use maestro_proxy::LaunchSpec;
use maestro_types::{AgentDefinition, TestCase, ToolBinding};

use crate::catalog;
use crate::docs;
use crate::error::{Result, ServerError};
use crate::params::ParamExt;
use crate::state::AppState;
use crate::version;

pub struct Dispatcher {
    state: Arc<AppState>,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Route one tool call. Unknown names fail before any validation.
    pub async fn dispatch(&self, tool: &str, args: Value) -> Result<Value> {
        if catalog::entry(tool).is_none() {
            return Err(ServerError::UnknownCatalogueTool(tool.to_string()));
        }

        tracing::debug!(tool = %tool, "dispatching tool call");
        let result = match tool {
            "create_adk_agent" => self.create_agent(&args).await,
            "list_adk_agents" => self.list_agents().await,
            "get_adk_agent_info" => self.agent_info(&args).await,
            "run_adk_agent" => self.run_agent(&args).await,
            "create_multi_agent_system" => self.create_multi_agent(&args).await,
            "add_mcp_tools_to_agent" => self.add_proxy_tools(&args).await,
            "evaluate_adk_agent" => self.evaluate_agent(&args).await,
            "list_available_tools" => self.list_tools().await,
            "search_web" | "load_webpage_content" => self.run_builtin(tool, args).await,
            "get_adk_documentation" => self.documentation(&args),
            "get_server_version" => Ok(version::version_report()),
            other => Err(ServerError::UnknownCatalogueTool(other.to_string())),
        };

        if let Err(e) = &result {
            tracing::warn!(tool = %tool, kind = e.kind(), error = %e, "tool call failed");
        }
        result
    }

    async fn create_agent(&self, args: &Value) -> Result<Value> {
        let name = args.required_str("name")?;
        let instruction = args.required_str("instruction")?;
        let description = args.optional_str("description")?.unwrap_or("");
        let model = args
            .optional_str("model")?
            .unwrap_or(&self.state.config.default_model);
        let overwrite = args.optional_bool("overwrite", false)?;

        let bindings: Vec<ToolBinding> = args
            .optional_string_array("tools")?
            .unwrap_or_default()
            .into_iter()
            .map(ToolBinding::builtin)
            .collect();

        let def = AgentDefinition::new(name, instruction, model)
            .with_description(description)
            .with_tools(bindings);
        let summary = def.summary();
        self.state.registry.create(def, overwrite).await?;

        Ok(json!({ "status": "success", "agent": summary }))
    }

    async fn list_agents(&self) -> Result<Value> {
        let agents = self.state.registry.list().await;
        Ok(json!({
            "status": "success",
            "count": agents.len(),
            "agents": agents,
        }))
    }

    async fn agent_info(&self, args: &Value) -> Result<Value> {
        let name = args.required_str("agent_name")?;
        let def = self.state.registry.get(name).await?;
        Ok(json!({ "status": "success", "agent": def }))
    }

    async fn run_agent(&self, args: &Value) -> Result<Value> {
        let name = args.required_str("agent_name")?;
        let message = args.required_str("message")?;
        let session_id = args.optional_str("session_id")?.map(str::to_string);

        let outcome = self.state.engine.run(name, message, session_id).await?;
        Ok(json!({
            "status": "success",
            "agent_name": name,
            "response": outcome.reply,
            "session_id": outcome.session_id,
            "turn_count": outcome.turn_count,
        }))
    }

    async fn create_multi_agent(&self, args: &Value) -> Result<Value> {
        let req = ComposeRequest {
            name: args.required_str("coordinator_name")?.to_string(),
            instruction: args.required_str("coordinator_instruction")?.to_string(),
            description: args.optional_str("description")?.unwrap_or("").to_string(),
            model: args
                .optional_str("model")?
                .unwrap_or(&self.state.config.default_model)
                .to_string(),
            sub_agents: args.required_string_array("sub_agents")?,
            overwrite: args.optional_bool("overwrite", false)?,
        };
        let sub_agents = req.sub_agents.clone();

        let def = self.state.composer.compose(req).await?;
        Ok(json!({
            "status": "success",
            "agent": def.summary(),
            "sub_agents": sub_agents,
        }))
    }

    async fn add_proxy_tools(&self, args: &Value) -> Result<Value> {
        let agent_name = args.required_str("agent_name")?;
        let command = args.required_str("mcp_server_command")?;
        let proxy_args = args.required_string_array("mcp_server_args")?;
        let tool_filter = args.optional_string_array("tool_filter")?;

        // The agent must exist before a child is launched on its behalf.
        let mut def = self.state.registry.get(agent_name).await?;

        let spec = LaunchSpec::new(command).with_args(proxy_args);
        let outcome = self.state.proxies.attach(spec, tool_filter).await?;

        let added: Vec<String> = outcome.tools.iter().map(|t| t.name.clone()).collect();
        for tool in &added {
            def.tools
                .push(ToolBinding::proxied(outcome.proxy_id, tool.clone()));
        }
        // The agent can be deleted while the child handshakes; tear the
        // orphaned proxy down instead of leaking it until shutdown.
        if let Err(e) = self.state.registry.update(def).await {
            if let Err(close_err) = self.state.proxies.close(outcome.proxy_id).await {
                tracing::warn!(proxy_id = %outcome.proxy_id, error = %close_err, "failed to close orphaned proxy");
            }
            return Err(e.into());
        }

        let mut body = json!({
            "status": "success",
            "agent_name": agent_name,
            "proxy_id": outcome.proxy_id,
            "server": outcome.server.name,
            "tools_added": added,
        });
        if outcome.no_matching_tools {
            body["warning"] =
                json!("tool_filter matched none of the tools the server advertises");
        }
        Ok(body)
    }

    async fn evaluate_agent(&self, args: &Value) -> Result<Value> {
        let agent_name = args.required_str("agent_name")?;
        let raw_cases = args.get("test_cases").cloned().ok_or_else(|| {
            ServerError::bad_request("missing required argument 'test_cases'")
        })?;
        let cases: Vec<TestCase> = serde_json::from_value(raw_cases).map_err(|e| {
            ServerError::bad_request(format!(
                "'test_cases' must be a list of {{input, expected_output}} objects: {}",
                e
            ))
        })?;

        let report = evaluate(&self.state.engine, agent_name, cases).await?;
        let pass_rate = report.pass_rate();
        let mut body = serde_json::to_value(&report)
            .map_err(|e| ServerError::bad_request(e.to_string()))?;
        body["status"] = json!("success");
        body["pass_rate"] = json!(pass_rate);
        Ok(body)
    }

    async fn list_tools(&self) -> Result<Value> {
        let builtin: Vec<Value> = self
            .state
            .builtins
            .handles()
            .iter()
            .map(|h| json!({ "name": h.name(), "description": h.description() }))
            .collect();
        let proxies = self.state.proxies.list().await;

        Ok(json!({
            "status": "success",
            "builtin": builtin,
            "proxies": proxies,
        }))
    }

    /// search_web and load_webpage_content run directly on the host,
    /// outside any agent or session.
    async fn run_builtin(&self, tool: &str, args: Value) -> Result<Value> {
        let handle = self
            .state
            .builtins
            .get(tool)
            .ok_or_else(|| ServerError::UnknownCatalogueTool(tool.to_string()))?;

        let output = handle
            .invoke(args)
            .await
            .map_err(|e| ServerError::ToolFailed {
                tool: tool.to_string(),
                message: e.to_string(),
            })?;
        Ok(json!({ "status": "success", "content": output }))
    }

    fn documentation(&self, args: &Value) -> Result<Value> {
        let topic = args.required_str("topic")?;
        match docs::topic(topic) {
            Some(content) => Ok(json!({
                "status": "success",
                "topic": topic,
                "content": content,
            })),
            None => Ok(json!({
                "status": "success",
                "topic": topic,
                "content": Value::Null,
                "message": format!("no documentation for '{}'", topic),
                "available_topics": docs::topic_names(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use maestro_llm::{MockBackend, ModelBackend};

    fn dispatcher() -> (Dispatcher, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        let state = Arc::new(AppState::new(
            backend.clone() as Arc<dyn ModelBackend>,
            ServerConfig::default(),
        ));
        (Dispatcher::new(state), backend)
    }

    async fn create(d: &Dispatcher, name: &str) -> Value {
        d.dispatch(
            "create_adk_agent",
            json!({ "name": name, "instruction": "Be brief." }),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let (d, _) = dispatcher();
        let err = d.dispatch("self_destruct", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn create_list_info_round_trip() {
        let (d, _) = dispatcher();
        let created = create(&d, "helper").await;
        assert_eq!(created["status"], "success");
        assert_eq!(created["agent"]["name"], "helper");
        assert_eq!(created["agent"]["model"], "gemini-2.0-flash");

        let listed = d.dispatch("list_adk_agents", json!({})).await.unwrap();
        assert_eq!(listed["count"], 1);

        let info = d
            .dispatch("get_adk_agent_info", json!({ "agent_name": "helper" }))
            .await
            .unwrap();
        assert_eq!(info["agent"]["instruction"], "Be brief.");
    }

    #[tokio::test]
    async fn missing_required_argument_is_bad_request() {
        let (d, _) = dispatcher();
        let err = d
            .dispatch("create_adk_agent", json!({ "name": "x" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "bad_request");
        assert!(err.to_string().contains("instruction"));
    }

    #[tokio::test]
    async fn duplicate_create_is_conflict() {
        let (d, _) = dispatcher();
        create(&d, "helper").await;
        let err = d
            .dispatch(
                "create_adk_agent",
                json!({ "name": "helper", "instruction": "other" }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn run_returns_reply_and_session() {
        let (d, backend) = dispatcher();
        create(&d, "helper").await;
        backend.push_reply("hi there");

        let body = d
            .dispatch(
                "run_adk_agent",
                json!({ "agent_name": "helper", "message": "hello" }),
            )
            .await
            .unwrap();
        assert_eq!(body["response"], "hi there");
        assert_eq!(body["turn_count"], 2);
        assert!(body["session_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn run_against_missing_agent_is_not_found() {
        let (d, _) = dispatcher();
        let err = d
            .dispatch(
                "run_adk_agent",
                json!({ "agent_name": "ghost", "message": "hello" }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn multi_agent_requires_existing_sub_agents() {
        let (d, _) = dispatcher();
        create(&d, "worker").await;

        let err = d
            .dispatch(
                "create_multi_agent_system",
                json!({
                    "coordinator_name": "lead",
                    "coordinator_instruction": "Delegate.",
                    "sub_agents": ["worker", "ghost"]
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "composition_error");

        let ok = d
            .dispatch(
                "create_multi_agent_system",
                json!({
                    "coordinator_name": "lead",
                    "coordinator_instruction": "Delegate.",
                    "sub_agents": ["worker"]
                }),
            )
            .await
            .unwrap();
        assert_eq!(ok["agent"]["is_coordinator"], true);
        assert_eq!(ok["sub_agents"], json!(["worker"]));
    }

    #[tokio::test]
    async fn evaluation_reports_pass_rate() {
        let (d, backend) = dispatcher();
        create(&d, "math").await;
        backend.push_reply("it is 4");
        backend.push_reply("no clue");

        let body = d
            .dispatch(
                "evaluate_adk_agent",
                json!({
                    "agent_name": "math",
                    "test_cases": [
                        { "input": "2+2", "expected_output": "4" },
                        { "input": "3+3", "expected_output": "6" }
                    ]
                }),
            )
            .await
            .unwrap();
        assert_eq!(body["total"], 2);
        assert_eq!(body["passed"], 1);
        assert_eq!(body["pass_rate"], 0.5);
    }

    #[tokio::test]
    async fn evaluation_rejects_malformed_cases() {
        let (d, _) = dispatcher();
        create(&d, "math").await;
        let err = d
            .dispatch(
                "evaluate_adk_agent",
                json!({ "agent_name": "math", "test_cases": [{ "input": "2+2" }] }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "bad_request");
    }

    #[tokio::test]
    async fn add_proxy_tools_requires_existing_agent() {
        let (d, _) = dispatcher();
        let err = d
            .dispatch(
                "add_mcp_tools_to_agent",
                json!({ "agent_name": "ghost", "mcp_server_command": "whatever", "mcp_server_args": [] }),
            )
            .await
            .unwrap_err();
        // No child process is launched for a missing agent.
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn add_proxy_tools_requires_server_args() {
        let (d, _) = dispatcher();
        create(&d, "helper").await;
        let err = d
            .dispatch(
                "add_mcp_tools_to_agent",
                json!({ "agent_name": "helper", "mcp_server_command": "whatever" }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "bad_request");
        assert!(err.to_string().contains("mcp_server_args"));
    }

    #[tokio::test]
    async fn add_proxy_tools_surfaces_launch_failure() {
        let (d, _) = dispatcher();
        create(&d, "helper").await;
        let err = d
            .dispatch(
                "add_mcp_tools_to_agent",
                json!({
                    "agent_name": "helper",
                    "mcp_server_command": "no-such-binary-13579",
                    "mcp_server_args": []
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "launch_failed");

        // The agent's definition is untouched by the failed attach.
        let info = d
            .dispatch("get_adk_agent_info", json!({ "agent_name": "helper" }))
            .await
            .unwrap();
        assert_eq!(info["agent"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn list_available_tools_includes_builtins() {
        let (d, _) = dispatcher();
        let body = d.dispatch("list_available_tools", json!({})).await.unwrap();
        let names: Vec<&str> = body["builtin"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["search_web", "load_webpage_content"]);
        assert_eq!(body["proxies"], json!([]));
    }

    #[tokio::test]
    async fn documentation_known_and_unknown_topics() {
        let (d, _) = dispatcher();
        let known = d
            .dispatch("get_adk_documentation", json!({ "topic": "evaluation" }))
            .await
            .unwrap();
        assert!(known["content"].as_str().unwrap().contains("expected_output"));

        let unknown = d
            .dispatch("get_adk_documentation", json!({ "topic": "quantum" }))
            .await
            .unwrap();
        assert!(unknown["content"].is_null());
        assert!(
            unknown["available_topics"]
                .as_array()
                .unwrap()
                .contains(&json!("agents"))
        );
    }

    #[tokio::test]
    async fn version_report_is_served() {
        let (d, _) = dispatcher();
        let body = d.dispatch("get_server_version", json!({})).await.unwrap();
        assert_eq!(body["name"], "maestro");
        assert!(body["supported_models"].as_array().is_some());
    }
}

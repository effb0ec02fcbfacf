//! Google Generative Language API backend implementation.
//!
//! This module provides the `GeminiBackend` which connects to the
//! `generateContent` endpoint for Gemini completions, including a bounded
//! function-calling loop over the resolved tool handles.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ModelBackend, ToolHandle, find_handle};
use crate::error::{LlmError, Result};
use crate::types::GenerateRequest;

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Maximum rounds of tool calls before giving up on the model converging.
const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum function-calling rounds per turn.
    pub max_tool_rounds: u32,
}

impl GeminiConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Create config from environment variables.
    ///
    /// Checks `GEMINI_API_KEY` first, then `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| {
                LlmError::missing_credentials("gemini", "GEMINI_API_KEY or GOOGLE_API_KEY")
            })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiToolset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ApiPart>,
}

impl ApiContent {
    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![ApiPart {
                text: Some(text.into()),
                function_call: None,
                function_response: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<ApiFunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiToolset {
    function_declarations: Vec<ApiFunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
struct ApiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    content: Option<ApiContent>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Gemini Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Google Gemini API backend.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Create a new Gemini backend with the given configuration.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a backend from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Build the generateContent endpoint URL for a model.
    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.config.base_url, model)
    }

    /// Send one generateContent request and return the first candidate.
    async fn send_request(&self, model: &str, body: &ApiRequest) -> Result<ApiContent> {
        let response = self
            .client
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::unavailable(format!("request to Gemini failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::unavailable(format!("failed to read Gemini response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or(text);

            return Err(if status.as_u16() == 429 || status.is_server_error() {
                LlmError::unavailable(format!("Gemini returned {status}: {message}"))
            } else {
                LlmError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&text)?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| LlmError::invalid_response("response contained no candidates"))
    }

    /// Build the initial contents from history + new message.
    fn build_contents(request: &GenerateRequest) -> Vec<ApiContent> {
        let mut contents = Vec::with_capacity(request.history.len() + 1);
        for turn in &request.history {
            let role = match turn.role {
                maestro_types::Role::User => "user",
                maestro_types::Role::Agent => "model",
            };
            contents.push(ApiContent::text(role, turn.content.clone()));
        }
        contents.push(ApiContent::text("user", request.message.clone()));
        contents
    }

    /// Extract function calls from a model content block.
    fn function_calls(content: &ApiContent) -> Vec<ApiFunctionCall> {
        content
            .parts
            .iter()
            .filter_map(|p| p.function_call.clone())
            .collect()
    }

    /// Concatenate the text parts of a model content block.
    fn collect_text(content: &ApiContent) -> String {
        content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn generate(
        &self,
        request: GenerateRequest,
        tools: &[Arc<dyn ToolHandle>],
    ) -> Result<String> {
        let toolsets = if tools.is_empty() {
            Vec::new()
        } else {
            vec![ApiToolset {
                function_declarations: tools
                    .iter()
                    .map(|t| ApiFunctionDeclaration {
                        name: t.name().to_string(),
                        description: t.description().to_string(),
                        parameters: t.parameters(),
                    })
                    .collect(),
            }]
        };

        let system_instruction = if request.instruction.is_empty() {
            None
        } else {
            Some(ApiContent {
                role: None,
                parts: vec![ApiPart {
                    text: Some(request.instruction.clone()),
                    function_call: None,
                    function_response: None,
                }],
            })
        };

        let mut contents = Self::build_contents(&request);

        for round in 0..=self.config.max_tool_rounds {
            let body = ApiRequest {
                contents: contents.clone(),
                system_instruction: system_instruction.clone(),
                tools: toolsets.clone(),
            };

            let content = self.send_request(&request.model, &body).await?;
            let calls = Self::function_calls(&content);

            if calls.is_empty() {
                return Ok(Self::collect_text(&content));
            }

            if round == self.config.max_tool_rounds {
                return Err(LlmError::invalid_response(format!(
                    "model did not converge after {} tool rounds",
                    self.config.max_tool_rounds
                )));
            }

            tracing::debug!(
                model = %request.model,
                round,
                call_count = calls.len(),
                "executing model-requested tool calls"
            );

            // Echo the model's content back, then answer every call.
            contents.push(ApiContent {
                role: Some("model".to_string()),
                ..content
            });

            let mut response_parts = Vec::with_capacity(calls.len());
            for call in calls {
                let output = match find_handle(tools, &call.name) {
                    Some(handle) => match handle.invoke(call.args.clone()).await {
                        Ok(output) => serde_json::json!({ "output": output }),
                        Err(e) => serde_json::json!({ "error": e.to_string() }),
                    },
                    None => serde_json::json!({
                        "error": format!("unknown tool '{}'", call.name)
                    }),
                };
                response_parts.push(ApiPart {
                    text: None,
                    function_call: None,
                    function_response: Some(ApiFunctionResponse {
                        name: call.name,
                        response: output,
                    }),
                });
            }

            contents.push(ApiContent {
                role: Some("user".to_string()),
                parts: response_parts,
            });
        }

        // Loop always returns or errors before falling through.
        Err(LlmError::invalid_response("tool loop exited unexpectedly"))
    }

    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<()> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::missing_credentials(
                "gemini",
                "GEMINI_API_KEY or GOOGLE_API_KEY",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_types::Turn;

    #[test]
    fn test_config_builder() {
        let config = GeminiConfig::new("key123")
            .with_base_url("http://localhost:9999")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.api_key, "key123");
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_generate_url() {
        let backend = GeminiBackend::new(GeminiConfig::new("k")).unwrap();
        let url = backend.generate_url("gemini-2.0-flash");
        assert!(url.ends_with("/models/gemini-2.0-flash:generateContent"));
    }

    #[test]
    fn test_build_contents_maps_roles() {
        let request = GenerateRequest::new("m", "i", "now")
            .with_history(vec![Turn::user("before"), Turn::agent("reply")]);
        let contents = GeminiBackend::build_contents(&request);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[2].role.as_deref(), Some("user"));
        assert_eq!(contents[2].parts[0].text.as_deref(), Some("now"));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello "}, {"text": "world"}]
                }
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(json).unwrap();
        let content = parsed.candidates[0].content.as_ref().unwrap();
        assert_eq!(GeminiBackend::collect_text(content), "Hello world");
        assert!(GeminiBackend::function_calls(content).is_empty());
    }

    #[test]
    fn test_function_call_parsing() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "search_web", "args": {"query": "rust"}}}]
                }
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(json).unwrap();
        let content = parsed.candidates[0].content.as_ref().unwrap();
        let calls = GeminiBackend::function_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "search_web");
        assert_eq!(calls[0].args["query"], "rust");
    }

    #[tokio::test]
    async fn test_health_check_rejects_empty_key() {
        let backend = GeminiBackend::new(GeminiConfig::new("")).unwrap();
        let err = backend.health_check().await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredentials { .. }));
    }
}

//! Stdio serving loop.
//!
//! The host speaks newline-delimited JSON-RPC 2.0 on stdin/stdout. Each
//! tools/call is dispatched on its own task so a slow agent run never
//! blocks the read loop; a single writer task serializes responses so
//! output lines cannot interleave. All logging goes to stderr and the
//! log file, never stdout.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use maestro_proxy::protocol::{JSONRPC_VERSION, JsonRpcError, PROXY_PROTOCOL_VERSION};

use crate::catalog;
use crate::dispatch::Dispatcher;
use crate::state::AppState;
use crate::version::{SERVER_NAME, SERVER_VERSION};

/// An incoming frame. The id is kept opaque so numeric and string ids
/// round-trip unchanged; a missing id marks a notification.
#[derive(Debug, Deserialize)]
struct IncomingFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

fn success_frame(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result })
}

fn error_frame(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": { "code": code, "message": message.into() },
    })
}

/// Wrap dispatcher output in a tools/call result. Host-level failures
/// become `isError` results so the caller sees the classified body
/// instead of an opaque protocol error.
fn call_result(outcome: crate::error::Result<Value>) -> Value {
    match outcome {
        Ok(body) => {
            let text = body.to_string();
            json!({ "content": [{ "type": "text", "text": text }] })
        }
        Err(e) => {
            let text = serde_json::to_string(&e.to_body()).unwrap_or_else(|_| e.to_string());
            json!({ "content": [{ "type": "text", "text": text }], "isError": true })
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROXY_PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
    })
}

fn list_tools_result() -> Value {
    json!({ "tools": catalog::catalogue() })
}

async fn handle_request(dispatcher: &Dispatcher, frame: IncomingFrame) -> Option<Value> {
    let id = frame.id?;
    match frame.method.as_str() {
        "initialize" => Some(success_frame(id, initialize_result())),
        "ping" => Some(success_frame(id, json!({}))),
        "tools/list" => Some(success_frame(id, list_tools_result())),
        "tools/call" => {
            let params = frame.params.unwrap_or(Value::Null);
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(error_frame(
                    id,
                    JsonRpcError::INVALID_PARAMS,
                    "tools/call requires a 'name' parameter",
                ));
            };
            let args = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));
            let outcome = dispatcher.dispatch(name, args).await;
            Some(success_frame(id, call_result(outcome)))
        }
        other => Some(error_frame(
            id,
            JsonRpcError::METHOD_NOT_FOUND,
            format!("unknown method '{}'", other),
        )),
    }
}

/// Serve newline-delimited JSON-RPC until stdin closes.
pub async fn serve_stdio(state: Arc<AppState>) -> std::io::Result<()> {
    let dispatcher = Arc::new(Dispatcher::new(state));
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(frame) = rx.recv().await {
            let mut line = frame.to_string();
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    tracing::info!(name = SERVER_NAME, version = SERVER_VERSION, "serving on stdio");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let frame: IncomingFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unparseable frame");
                let _ = tx.send(error_frame(
                    Value::Null,
                    JsonRpcError::PARSE_ERROR,
                    e.to_string(),
                ));
                continue;
            }
        };

        // Notifications (no id) are acknowledged by silence.
        if frame.id.is_none() {
            tracing::debug!(method = %frame.method, "notification received");
            continue;
        }

        let dispatcher = Arc::clone(&dispatcher);
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(reply) = handle_request(&dispatcher, frame).await {
                let _ = tx.send(reply);
            }
        });
    }

    drop(tx);
    let _ = writer.await;

    tracing::info!("stdin closed, shutting down");
    let state = dispatcher.state();
    state.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use maestro_llm::{MockBackend, ModelBackend};

    fn dispatcher() -> Dispatcher {
        let backend = Arc::new(MockBackend::new()) as Arc<dyn ModelBackend>;
        Dispatcher::new(Arc::new(AppState::new(backend, ServerConfig::default())))
    }

    fn frame(json: Value) -> IncomingFrame {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let d = dispatcher();
        let reply = handle_request(&d, frame(json!({ "id": 1, "method": "initialize" })))
            .await
            .unwrap();
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["serverInfo"]["name"], "maestro");
        assert_eq!(reply["result"]["protocolVersion"], PROXY_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn tools_list_exposes_catalogue() {
        let d = dispatcher();
        let reply = handle_request(&d, frame(json!({ "id": "a", "method": "tools/list" })))
            .await
            .unwrap();
        assert_eq!(reply["id"], "a");
        let tools = reply["result"]["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "create_adk_agent"));
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn tools_call_wraps_success_body() {
        let d = dispatcher();
        let reply = handle_request(
            &d,
            frame(json!({
                "id": 2,
                "method": "tools/call",
                "params": { "name": "get_server_version", "arguments": {} }
            })),
        )
        .await
        .unwrap();
        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["name"], "maestro");
    }

    #[tokio::test]
    async fn tools_call_failure_sets_is_error() {
        let d = dispatcher();
        let reply = handle_request(
            &d,
            frame(json!({
                "id": 3,
                "method": "tools/call",
                "params": { "name": "run_adk_agent", "arguments": { "agent_name": "ghost", "message": "hi" } }
            })),
        )
        .await
        .unwrap();
        assert_eq!(reply["result"]["isError"], true);
        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn tools_call_without_name_is_invalid_params() {
        let d = dispatcher();
        let reply = handle_request(
            &d,
            frame(json!({ "id": 4, "method": "tools/call", "params": {} })),
        )
        .await
        .unwrap();
        assert_eq!(reply["error"]["code"], JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let d = dispatcher();
        let reply = handle_request(&d, frame(json!({ "id": 5, "method": "resources/list" })))
            .await
            .unwrap();
        assert_eq!(reply["error"]["code"], JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn notification_produces_no_reply() {
        let d = dispatcher();
        let reply = handle_request(
            &d,
            frame(json!({ "method": "notifications/initialized" })),
        )
        .await;
        assert!(reply.is_none());
    }
}

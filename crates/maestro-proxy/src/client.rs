//! Blocking JSON-RPC client for a single proxy child.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde_json::Value;

use crate::error::{ProxyError, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, ListToolsResult, PeerInfo, RemoteTool,
};
use crate::transport::{ChildKiller, ProxyTransport};

/// How to launch a proxy child process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Client for one proxied tool server.
///
/// All methods block; the manager runs them on the blocking thread pool.
/// The transport mutex serializes requests so responses pair with the
/// request that produced them.
pub struct ProxyClient {
    spec: LaunchSpec,
    transport: Mutex<ProxyTransport>,
    killer: ChildKiller,
    server_info: Mutex<Option<PeerInfo>>,
    request_id: AtomicU64,
    initialized: AtomicBool,
}

impl ProxyClient {
    /// Spawn the child process. Does not perform the handshake; call
    /// `initialize` afterwards.
    pub fn launch(spec: LaunchSpec) -> Result<Self> {
        let transport = ProxyTransport::spawn(&spec.command, &spec.args, &spec.env)?;
        let killer = transport.killer();

        tracing::info!(command = %spec.command, "launched proxy child");

        Ok(Self {
            spec,
            transport: Mutex::new(transport),
            killer,
            server_info: Mutex::new(None),
            request_id: AtomicU64::new(1),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn command(&self) -> &str {
        &self.spec.command
    }

    /// Kill switch usable while another thread is blocked inside a request.
    pub fn killer(&self) -> ChildKiller {
        self.killer.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn server_info(&self) -> Option<PeerInfo> {
        self.server_info.lock().ok().and_then(|g| g.clone())
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let request = JsonRpcRequest::new(self.next_request_id(), method, params);
        let mut transport = self
            .transport
            .lock()
            .map_err(|_| ProxyError::protocol("transport lock poisoned"))?;
        let response = transport.send_request(&request)?;
        response.into_result().map_err(|e| ProxyError::Server {
            code: e.code,
            message: e.message,
        })
    }

    fn send_notification(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        let mut transport = self
            .transport
            .lock()
            .map_err(|_| ProxyError::protocol("transport lock poisoned"))?;
        transport.send_notification(&notification)
    }

    /// Perform the initialize handshake and send the initialized
    /// notification. Idempotent.
    pub fn initialize(&self) -> Result<PeerInfo> {
        if self.is_initialized() {
            return self
                .server_info()
                .ok_or_else(|| ProxyError::protocol("initialized without server info"));
        }

        let params = InitializeParams::default();
        let result = self.send_request("initialize", Some(serde_json::to_value(&params)?))?;
        let init: InitializeResult = serde_json::from_value(result)?;

        tracing::info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            "proxy handshake complete"
        );

        self.send_notification("notifications/initialized", None)?;

        if let Ok(mut guard) = self.server_info.lock() {
            *guard = Some(init.server_info.clone());
        }
        self.initialized.store(true, Ordering::SeqCst);

        Ok(init.server_info)
    }

    /// List the tools the child advertises.
    pub fn list_tools(&self) -> Result<Vec<RemoteTool>> {
        let result = self.send_request("tools/list", None)?;
        let list: ListToolsResult = serde_json::from_value(result)?;
        tracing::debug!(
            command = %self.spec.command,
            tool_count = list.tools.len(),
            "listed proxy tools"
        );
        Ok(list.tools)
    }

    /// Invoke a tool on the child and return its result.
    pub fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result = self.send_request("tools/call", Some(serde_json::to_value(&params)?))?;
        let call: CallToolResult = serde_json::from_value(result)?;

        if call.is_error() {
            tracing::warn!(command = %self.spec.command, tool = %name, "proxied tool returned error");
        } else {
            tracing::debug!(command = %self.spec.command, tool = %name, "proxied tool call succeeded");
        }
        Ok(call)
    }

    /// Kill the child process.
    pub fn shutdown(&self) {
        self.killer.kill();
    }
}

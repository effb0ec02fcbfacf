//! Stdio transport for proxied tool servers.
//!
//! Each proxy is a child process that speaks Content-Length framed JSON-RPC
//! over its stdin/stdout. All reads and writes here are blocking; callers
//! run them on the blocking thread pool.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};

use crate::error::{ProxyError, Result};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Shared kill switch for a proxy child.
///
/// Held separately from the pipe buffers so a supervisor can terminate the
/// process while another thread is blocked on a read. Killing the child
/// closes its stdout, which unblocks that read with `ConnectionClosed`.
#[derive(Clone)]
pub struct ChildKiller {
    child: Arc<Mutex<Child>>,
}

impl ChildKiller {
    /// Kill the child process and reap it.
    pub fn kill(&self) {
        if let Ok(mut child) = self.child.lock() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// True while the child has not exited.
    pub fn is_alive(&self) -> bool {
        match self.child.lock() {
            Ok(mut child) => matches!(child.try_wait(), Ok(None)),
            Err(_) => false,
        }
    }
}

/// Blocking framed channel to one proxy child.
pub struct ProxyTransport {
    child: Arc<Mutex<Child>>,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ProxyTransport {
    /// Spawn the child process with piped stdio.
    ///
    /// The child's stderr is inherited so its diagnostics reach the host
    /// process log stream.
    pub fn spawn(command: &str, args: &[String], env: &[(String, String)]) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ProxyError::launch_failed(command, e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProxyError::launch_failed(command, "failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProxyError::launch_failed(command, "failed to capture stdout"))?;

        Ok(Self {
            child: Arc::new(Mutex::new(child)),
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    /// Handle for terminating the child from another thread.
    pub fn killer(&self) -> ChildKiller {
        ChildKiller {
            child: Arc::clone(&self.child),
        }
    }

    /// Send a request and block until the matching response arrives.
    ///
    /// Responses whose id does not match are discarded; they are stragglers
    /// from calls the supervisor already gave up on.
    pub fn send_request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.send_message(&serde_json::to_value(request)?)?;
        loop {
            let response = self.receive_response()?;
            if response.id == request.id {
                return Ok(response);
            }
            tracing::trace!(
                expected = request.id,
                received = response.id,
                "discarding stale proxy response"
            );
        }
    }

    /// Send a notification. No response is read.
    pub fn send_notification(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        self.send_message(&serde_json::to_value(notification)?)
    }

    fn send_message(&mut self, message: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(message)?;
        write!(self.stdin, "Content-Length: {}\r\n\r\n", json.len())?;
        write!(self.stdin, "{}", json)?;
        self.stdin.flush()?;
        tracing::trace!(content_length = json.len(), json = %json, "sent proxy message");
        Ok(())
    }

    fn receive_response(&mut self) -> Result<JsonRpcResponse> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = self.stdout.read_line(&mut line)?;
            if bytes_read == 0 {
                return Err(ProxyError::ConnectionClosed);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some(len_str) = trimmed.strip_prefix("Content-Length:") {
                content_length = Some(len_str.trim().parse().map_err(|e| {
                    ProxyError::protocol(format!("invalid Content-Length: {}", e))
                })?);
            }
        }

        let content_length =
            content_length.ok_or_else(|| ProxyError::protocol("missing Content-Length header"))?;

        let mut body = vec![0u8; content_length];
        self.stdout.read_exact(&mut body)?;

        let json_str = String::from_utf8(body)
            .map_err(|e| ProxyError::protocol(format!("invalid UTF-8 in response: {}", e)))?;
        tracing::trace!(content_length, json = %json_str, "received proxy message");

        Ok(serde_json::from_str(&json_str)?)
    }

    /// Kill the child and reap it.
    pub fn shutdown(&mut self) {
        if let Ok(mut child) = self.child.lock() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for ProxyTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

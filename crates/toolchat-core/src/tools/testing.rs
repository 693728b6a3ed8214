//! In-process fakes for exercising the registry without child processes

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::backoff::Backoff;
use super::session::{ToolConnector, ToolSession};
use crate::config::{ServerConfigSet, ServerLaunchConfig};
use crate::mcp::{McpError, McpResult};
use crate::types::ToolDescriptor;

/// A scripted tool server session
#[derive(Default)]
pub struct FakeSession {
    tools: Vec<ToolDescriptor>,
    results: HashMap<String, Result<Value, String>>,
    list_error: Option<String>,
    list_delay: Option<Duration>,
    fail_close: bool,
    fail_release: bool,
    calls: Mutex<Vec<(String, Value)>>,
    closed: AtomicUsize,
    released: AtomicUsize,
}

impl FakeSession {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names
                .iter()
                .map(|name| {
                    ToolDescriptor::new(*name, json!({"type": "object"}))
                        .with_description(format!("{name} tool"))
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn returning(mut self, tool: &str, result: Value) -> Self {
        self.results.insert(tool.to_string(), Ok(result));
        self
    }

    pub fn failing_call(mut self, tool: &str, message: &str) -> Self {
        self.results.insert(tool.to_string(), Err(message.to_string()));
        self
    }

    pub fn failing_discovery(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    /// Discovery takes this long to answer
    pub fn slow_discovery(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_close = true;
        self.fail_release = true;
        self
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.list_error {
            Some(message) => Err(McpError::Protocol(message.clone())),
            None => Ok(self.tools.clone()),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value> {
        self.calls.lock().push((name.to_string(), arguments));
        match self.results.get(name) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(McpError::ToolCallFailed(message.clone())),
            None => Ok(json!({"content": [{"type": "text", "text": "ok"}]})),
        }
    }

    async fn close(&self) -> McpResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(McpError::Protocol("close refused".into()));
        }
        Ok(())
    }

    async fn release(&self) -> McpResult<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(McpError::Protocol("kill refused".into()));
        }
        Ok(())
    }
}

/// What one connection attempt does
#[derive(Clone)]
pub enum FakeOutcome {
    Session(Arc<FakeSession>),
    SpawnFailure(String),
    PrematureExit(String),
    /// Never completes the handshake
    Hang,
}

/// Hands out scripted outcomes per server. The last queued outcome for a
/// server repeats once the rest are used up.
#[derive(Default)]
pub struct FakeConnector {
    script: Mutex<HashMap<String, VecDeque<FakeOutcome>>>,
    attempts: Mutex<HashMap<String, usize>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, server: &str, outcomes: impl IntoIterator<Item = FakeOutcome>) -> Self {
        self.script
            .lock()
            .entry(server.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    pub fn serve(self, server: &str, session: Arc<FakeSession>) -> Self {
        self.script(server, [FakeOutcome::Session(session)])
    }

    pub fn attempts(&self, server: &str) -> usize {
        self.attempts.lock().get(server).copied().unwrap_or(0)
    }

    fn next(&self, server: &str) -> Option<FakeOutcome> {
        let mut script = self.script.lock();
        let queue = script.get_mut(server)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ToolConnector for FakeConnector {
    async fn connect(
        &self,
        server: &str,
        _config: &ServerLaunchConfig,
    ) -> McpResult<Arc<dyn ToolSession>> {
        *self.attempts.lock().entry(server.to_string()).or_default() += 1;
        match self.next(server) {
            Some(FakeOutcome::Session(session)) => Ok(session as Arc<dyn ToolSession>),
            Some(FakeOutcome::SpawnFailure(message)) => Err(McpError::Spawn(message)),
            Some(FakeOutcome::PrematureExit(message)) => Err(McpError::PrematureExit(message)),
            Some(FakeOutcome::Hang) => {
                std::future::pending::<()>().await;
                Err(McpError::Closed)
            }
            None => Err(McpError::Spawn(format!("no script for '{server}'"))),
        }
    }
}

/// Counts waits instead of sleeping
#[derive(Default)]
pub struct RecordingBackoff {
    pub waits: AtomicU32,
}

#[async_trait]
impl Backoff for RecordingBackoff {
    async fn wait(&self, _attempt: u32) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Launch configs for each named server; the command is never run
pub fn configs(names: &[&str]) -> ServerConfigSet {
    names.iter().fold(ServerConfigSet::new(), |set, name| {
        set.with_server(*name, ServerLaunchConfig::new("fake-server", [format!("--name={name}")]))
    })
}

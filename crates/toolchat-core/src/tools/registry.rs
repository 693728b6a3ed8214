//! Registry of live tool-server connections
//!
//! Owns the lifecycle of every external tool server: spawn, handshake,
//! discovery, retry, timeout and teardown. The aggregate tool catalog is
//! always derived from the connections that are currently live.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::backoff::{Backoff, FixedBackoff};
use super::error::{ToolError, ToolResult};
use super::session::{ToolConnector, ToolSession};
use crate::config::{ConfigError, ServerConfigSet, ServerLaunchConfig};
use crate::logging::Logger;
use crate::mcp::McpConnector;
use crate::types::{Tool, ToolDescriptor};

/// Per-call connection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Additional attempts after the first one fails
    pub retries: u32,
    /// Budget for handshake plus discovery, per attempt
    pub timeout: Duration,
}

impl ConnectOptions {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            retries: 0,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One named tool server and what it published
pub struct ToolConnection {
    name: String,
    session: Option<Arc<dyn ToolSession>>,
    tools: Vec<ToolDescriptor>,
    connected: bool,
}

impl ToolConnection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Status line for one known server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub name: String,
    pub connected: bool,
    pub tool_count: usize,
}

/// Drives one `connect` call through its attempts
enum ConnectState {
    Attempt(u32),
    Backoff { failed: u32, error: ToolError },
    Done(ToolResult<(Arc<dyn ToolSession>, Vec<ToolDescriptor>)>),
}

/// Releases a half-built session if the attempt is abandoned before
/// discovery completes, e.g. when the timeout drops the attempt future.
struct SessionGuard {
    server: String,
    session: Option<Arc<dyn ToolSession>>,
    logger: Arc<dyn Logger>,
}

impl SessionGuard {
    fn new(server: &str, session: Arc<dyn ToolSession>, logger: Arc<dyn Logger>) -> Self {
        Self {
            server: server.to_string(),
            session: Some(session),
            logger,
        }
    }

    fn disarm(mut self) {
        self.session = None;
    }

    async fn release_now(mut self) {
        if let Some(session) = self.session.take() {
            release_quietly(&self.server, session.as_ref(), self.logger.as_ref()).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let server = std::mem::take(&mut self.server);
        let logger = Arc::clone(&self.logger);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_quietly(&server, session.as_ref(), logger.as_ref()).await;
                });
            }
            Err(_) => logger.warn(&format!(
                "[ToolRegistry] No runtime to release abandoned session for '{}'",
                server
            )),
        }
    }
}

async fn release_quietly(server: &str, session: &dyn ToolSession, logger: &dyn Logger) {
    if let Err(e) = session.release().await {
        logger.warn(&format!(
            "[ToolRegistry] Failed to release tool server '{}': {}",
            server, e
        ));
    }
}

/// Registry of named tool-server connections
pub struct ToolConnectionRegistry {
    connector: Arc<dyn ToolConnector>,
    backoff: Arc<dyn Backoff>,
    /// Launch configurations, installed before any connect
    configs: RwLock<ServerConfigSet>,
    /// Connections in the order they were first registered
    connections: RwLock<Vec<ToolConnection>>,
    logger: Arc<dyn Logger>,
}

impl ToolConnectionRegistry {
    pub fn new(connector: Arc<dyn ToolConnector>, logger: Arc<dyn Logger>) -> Self {
        Self {
            connector,
            backoff: Arc::new(FixedBackoff::default()),
            configs: RwLock::new(ServerConfigSet::new()),
            connections: RwLock::new(Vec::new()),
            logger,
        }
    }

    /// Registry that spawns real MCP servers as child processes
    pub fn with_mcp(logger: Arc<dyn Logger>) -> Self {
        let connector = Arc::new(McpConnector::new(Arc::clone(&logger)));
        Self::new(connector, logger)
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace the installed launch configurations. Live connections are
    /// left alone; new settings apply on the next connect.
    pub fn install_configs(&self, configs: ServerConfigSet) {
        self.logger.info(&format!(
            "[ToolRegistry] Installed {} server configuration(s)",
            configs.len()
        ));
        *self.configs.write() = configs;
    }

    pub fn installed_configs(&self) -> ServerConfigSet {
        self.configs.read().clone()
    }

    fn launch_config(&self, name: &str) -> ToolResult<ServerLaunchConfig> {
        let config = self
            .configs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingServer(name.to_string()))?;
        config.validate(name)?;
        Ok(config)
    }

    /// Connect to a configured server and discover its tools.
    ///
    /// Makes `retries + 1` attempts, each bounded by `options.timeout`.
    /// Connecting a name that is already live tears the old connection
    /// down first. On success the server's tools are returned tagged
    /// with their owner and join the aggregate catalog.
    pub async fn connect(
        &self,
        name: &str,
        options: &ConnectOptions,
    ) -> ToolResult<Vec<ToolDescriptor>> {
        let config = self.launch_config(name)?;

        if self.is_connected(name) {
            self.logger.info(&format!(
                "[ToolRegistry] Reconnecting '{}', tearing down existing connection",
                name
            ));
            self.disconnect(name).await;
        }

        let max_attempts = options.retries.saturating_add(1);
        let mut state = ConnectState::Attempt(1);
        let (session, tools) = loop {
            state = match state {
                ConnectState::Attempt(attempt) => {
                    self.logger.debug(&format!(
                        "[ToolRegistry] Connecting to '{}' (attempt {}/{})",
                        name, attempt, max_attempts
                    ));
                    match self.attempt(name, &config, options.timeout).await {
                        Ok(connected) => ConnectState::Done(Ok(connected)),
                        Err(error) if attempt < max_attempts && error.is_retryable() => {
                            ConnectState::Backoff {
                                failed: attempt,
                                error,
                            }
                        }
                        Err(error) => ConnectState::Done(Err(error)),
                    }
                }
                ConnectState::Backoff { failed, error } => {
                    self.logger.warn(&format!(
                        "[ToolRegistry] Attempt {}/{} for '{}' failed: {}",
                        failed, max_attempts, name, error
                    ));
                    self.backoff.wait(failed).await;
                    ConnectState::Attempt(failed + 1)
                }
                ConnectState::Done(Ok(connected)) => break connected,
                ConnectState::Done(Err(error)) => {
                    self.logger.error(&format!(
                        "[ToolRegistry] Giving up on '{}': {}",
                        name, error
                    ));
                    return Err(error);
                }
            };
        };

        let tools: Vec<ToolDescriptor> = tools.into_iter().map(|t| t.owned_by(name)).collect();
        self.logger.info(&format!(
            "[ToolRegistry] Connected to '{}' with {} tool(s)",
            name,
            tools.len()
        ));

        if let Some(displaced) = self.store(name, session, tools.clone()) {
            self.logger.warn(&format!(
                "[ToolRegistry] Concurrent connect replaced a live session for '{}'",
                name
            ));
            self.teardown(name, displaced).await;
        }
        Ok(tools)
    }

    /// One spawn + handshake + discovery, raced against `timeout`
    async fn attempt(
        &self,
        name: &str,
        config: &ServerLaunchConfig,
        timeout: Duration,
    ) -> ToolResult<(Arc<dyn ToolSession>, Vec<ToolDescriptor>)> {
        let work = async {
            let session = self
                .connector
                .connect(name, config)
                .await
                .map_err(|e| ToolError::connecting(name, e))?;
            let guard = SessionGuard::new(name, Arc::clone(&session), Arc::clone(&self.logger));

            match session.list_tools().await {
                Ok(tools) => {
                    guard.disarm();
                    Ok((session, tools))
                }
                Err(e) => {
                    guard.release_now().await;
                    Err(ToolError::connecting(name, e))
                }
            }
        };

        match tokio::time::timeout(timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                server: name.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Insert or replace the entry for `name`, keeping its position.
    /// Returns a still-live session that was displaced, if any.
    fn store(
        &self,
        name: &str,
        session: Arc<dyn ToolSession>,
        tools: Vec<ToolDescriptor>,
    ) -> Option<Arc<dyn ToolSession>> {
        let mut connections = self.connections.write();
        match connections.iter_mut().find(|c| c.name == name) {
            Some(entry) => {
                let displaced = entry.session.replace(session);
                entry.tools = tools;
                entry.connected = true;
                displaced
            }
            None => {
                connections.push(ToolConnection {
                    name: name.to_string(),
                    session: Some(session),
                    tools,
                    connected: true,
                });
                None
            }
        }
    }

    /// Tear down a connection. Unknown or already-disconnected names are a
    /// no-op. Close and release are attempted independently and their
    /// failures only logged; the entry always ends disconnected.
    pub async fn disconnect(&self, name: &str) {
        let session = {
            let mut connections = self.connections.write();
            let Some(entry) = connections.iter_mut().find(|c| c.name == name) else {
                return;
            };
            entry.connected = false;
            entry.tools.clear();
            entry.session.take()
        };

        if let Some(session) = session {
            self.teardown(name, session).await;
            self.logger
                .info(&format!("[ToolRegistry] Disconnected from '{}'", name));
        }
    }

    async fn teardown(&self, name: &str, session: Arc<dyn ToolSession>) {
        if let Err(e) = session.close().await {
            self.logger.warn(&format!(
                "[ToolRegistry] Failed to close connection to '{}': {}",
                name, e
            ));
        }
        release_quietly(name, session.as_ref(), self.logger.as_ref()).await;
    }

    /// Disconnect every live server, continuing past individual failures
    pub async fn disconnect_all(&self) {
        for name in self.list_connected_servers() {
            self.disconnect(&name).await;
        }
    }

    /// Connect every installed server, reporting each outcome as the tool
    /// count or the error. One server failing does not stop the others.
    pub async fn connect_all(&self, options: &ConnectOptions) -> Vec<(String, ToolResult<usize>)> {
        let names: Vec<String> = self.configs.read().names().map(str::to_string).collect();
        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.connect(&name, options).await.map(|tools| tools.len());
            outcomes.push((name, outcome));
        }
        outcomes
    }

    pub fn list_connected_servers(&self) -> Vec<String> {
        self.connections
            .read()
            .iter()
            .filter(|c| c.connected)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.connections
            .read()
            .iter()
            .any(|c| c.name == name && c.connected)
    }

    /// Aggregate catalog across live connections, in registration order
    pub fn list_all_tools(&self) -> Vec<ToolDescriptor> {
        self.connections
            .read()
            .iter()
            .filter(|c| c.connected)
            .flat_map(|c| c.tools.iter().cloned())
            .collect()
    }

    /// The aggregate catalog in the shape offered to the model
    pub fn llm_tools(&self) -> Vec<Tool> {
        self.list_all_tools().iter().map(Tool::from).collect()
    }

    /// First live connection, in registration order, exposing `tool`
    pub fn find_tool_owner(&self, tool: &str) -> Option<(String, Arc<dyn ToolSession>)> {
        self.connections.read().iter().find_map(|c| {
            if !c.connected || !c.tools.iter().any(|t| t.name == tool) {
                return None;
            }
            c.session
                .as_ref()
                .map(|session| (c.name.clone(), Arc::clone(session)))
        })
    }

    /// Every known server, connected or not
    pub fn server_summaries(&self) -> Vec<ServerSummary> {
        let connections = self.connections.read();
        let mut summaries: Vec<ServerSummary> = connections
            .iter()
            .map(|c| ServerSummary {
                name: c.name.clone(),
                connected: c.connected,
                tool_count: c.tools.len(),
            })
            .collect();
        for name in self.configs.read().names() {
            if !connections.iter().any(|c| c.name == name) {
                summaries.push(ServerSummary {
                    name: name.to_string(),
                    connected: false,
                    tool_count: 0,
                });
            }
        }
        summaries
    }
}

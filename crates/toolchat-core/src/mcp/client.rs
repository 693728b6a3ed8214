//! MCP client over a child-process stdio transport

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rmcp::{
    model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation, Tool},
    service::{Peer, RunningService},
    transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::config::ServerLaunchConfig;
use crate::logging::Logger;
use crate::tools::{ToolConnector, ToolSession};
use crate::types::ToolDescriptor;

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to spawn tool server process: {0}")]
    Spawn(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool server process exited during the handshake: {0}")]
    PrematureExit(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection already closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// Classify a handshake failure. A closed transport during `initialize`
    /// means the child went away before answering.
    pub fn from_initialize(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let exited = ["connection closed", "closed", "broken pipe", "unexpected eof", "exited"]
            .iter()
            .any(|needle| lower.contains(needle));
        if exited {
            McpError::PrematureExit(message)
        } else {
            McpError::InitializationFailed(message)
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

/// A live session with one tool server process
pub struct McpClient {
    server: String,
    peer: Peer<RoleClient>,
    /// Taken on close; dropping it stops the service and the child
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    logger: Arc<dyn Logger>,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolchat-core".to_string(),
            title: Some("Toolchat".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

fn descriptor_from_mcp(tool: Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: serde_json::to_value(tool.input_schema.as_ref()).unwrap_or_default(),
        owning_connection: String::new(),
    }
}

impl McpClient {
    /// Spawn the server process and perform the MCP handshake.
    ///
    /// The child inherits this process's environment with `config.env`
    /// layered on top, and is killed if the client is dropped.
    pub async fn spawn(
        server: &str,
        config: &ServerLaunchConfig,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        logger.info(&format!(
            "[McpClient] Spawning '{}': {} {}",
            server,
            config.command,
            config.args.join(" ")
        ));

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(std::env::vars())
            .envs(&config.env)
            .kill_on_drop(true);

        let transport = TokioChildProcess::new(cmd).map_err(|e| McpError::Spawn(e.to_string()))?;

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::from_initialize(e.to_string()))?;

        if let Some(info) = service.peer_info() {
            logger.info(&format!(
                "[McpClient] '{}' initialized: {} {}",
                server, info.server_info.name, info.server_info.version
            ));
        }

        Ok(Self {
            server: server.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            logger,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn is_open(&self) -> bool {
        self.service.lock().is_some()
    }

    /// List every tool, following pagination
    pub async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger.info(&format!(
            "[McpClient] '{}' listed {} tools",
            self.server,
            tools.len()
        ));

        Ok(tools.into_iter().map(descriptor_from_mcp).collect())
    }

    /// Call a tool by name; the result is returned as JSON, uninterpreted
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value> {
        self.logger.info(&format!("[McpClient] '{}' calling tool: {}", self.server, name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;

        serde_json::to_value(&result).map_err(|e| McpError::Protocol(e.to_string()))
    }

    /// Gracefully close the MCP session
    pub async fn close(&self) -> McpResult<()> {
        let service = self.service.lock().take().ok_or(McpError::Closed)?;
        self.logger.info(&format!("[McpClient] Closing '{}'", self.server));
        service
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }

    /// Drop whatever is left of the session, which kills the child
    pub fn release(&self) {
        if self.service.lock().take().is_some() {
            self.logger.debug(&format!("[McpClient] Released process for '{}'", self.server));
        }
    }
}

#[async_trait]
impl ToolSession for McpClient {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value> {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn close(&self) -> McpResult<()> {
        McpClient::close(self).await
    }

    async fn release(&self) -> McpResult<()> {
        McpClient::release(self);
        Ok(())
    }
}

/// Production connector: one child process per server
pub struct McpConnector {
    logger: Arc<dyn Logger>,
}

impl McpConnector {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl ToolConnector for McpConnector {
    async fn connect(
        &self,
        server: &str,
        config: &ServerLaunchConfig,
    ) -> McpResult<Arc<dyn ToolSession>> {
        let client = McpClient::spawn(server, config, Arc::clone(&self.logger)).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_initialize_error_classification() {
        assert!(matches!(
            McpError::from_initialize("connection closed: initialize response"),
            McpError::PrematureExit(_)
        ));
        assert!(matches!(
            McpError::from_initialize("Broken pipe (os error 32)"),
            McpError::PrematureExit(_)
        ));
        assert!(matches!(
            McpError::from_initialize("expected initialize result"),
            McpError::InitializationFailed(_)
        ));
    }

    #[test]
    fn test_descriptor_from_mcp_tool() {
        let tool: Tool = serde_json::from_value(serde_json::json!({
            "name": "search",
            "description": "Search the web",
            "inputSchema": {"type": "object", "properties": {"q": {"type": "string"}}}
        }))
        .unwrap();

        let descriptor = descriptor_from_mcp(tool);
        assert_eq!(descriptor.name, "search");
        assert_eq!(descriptor.description.as_deref(), Some("Search the web"));
        assert_eq!(descriptor.input_schema["type"], "object");
        assert!(descriptor.owning_connection.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let config = ServerLaunchConfig::new("toolchat-definitely-not-a-real-binary", Vec::<String>::new());
        let result = McpClient::spawn("ghost", &config, Arc::new(NoOpLogger)).await;
        assert!(matches!(
            result,
            Err(McpError::Spawn(_)) | Err(McpError::PrematureExit(_)) | Err(McpError::InitializationFailed(_))
        ));
    }
}

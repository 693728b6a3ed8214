//! Seams between the registry and the tool-server transport

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ServerLaunchConfig;
use crate::mcp::McpResult;
use crate::types::ToolDescriptor;

/// A live connection to one tool server.
///
/// Dropping the last handle must release the underlying process.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Capability discovery: every tool the server exposes, untagged
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>>;

    /// Execute a tool; the payload is passed through untouched
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value>;

    /// Gracefully close the logical connection
    async fn close(&self) -> McpResult<()>;

    /// Release process resources (kill the child if still running)
    async fn release(&self) -> McpResult<()>;
}

/// Spawns a tool server and completes the protocol handshake
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(
        &self,
        server: &str,
        config: &ServerLaunchConfig,
    ) -> McpResult<Arc<dyn ToolSession>>;
}

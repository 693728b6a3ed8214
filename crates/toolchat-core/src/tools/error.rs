//! Registry and invoker errors

use thiserror::Error;

use crate::config::ConfigError;
use crate::mcp::McpError;

#[derive(Error, Debug)]
pub enum ToolError {
    /// Missing or invalid launch configuration; never retried
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The server process died during the handshake
    #[error(
        "Tool server '{server}' exited during the handshake; the tool process likely failed to start. \
         Check that its command and arguments are correct and that it runs on its own. ({message})"
    )]
    PrematureExit { server: String, message: String },

    #[error("Tool server '{server}' did not finish connecting within {timeout_ms} ms")]
    Timeout { server: String, timeout_ms: u64 },

    /// Spawn, handshake or discovery failed for another reason
    #[error("Failed to connect to tool server '{server}': {source}")]
    Connection {
        server: String,
        #[source]
        source: McpError,
    },

    #[error("No connected tool server exposes a tool named '{0}'")]
    ToolNotFound(String),

    #[error("Tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: McpError,
    },
}

impl ToolError {
    /// Map a transport failure during connect to the registry's taxonomy
    pub fn connecting(server: impl Into<String>, source: McpError) -> Self {
        let server = server.into();
        match source {
            McpError::PrematureExit(message) => ToolError::PrematureExit { server, message },
            source => ToolError::Connection { server, source },
        }
    }

    /// Configuration problems fail fast; everything else may be retried
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ToolError::Config(_))
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

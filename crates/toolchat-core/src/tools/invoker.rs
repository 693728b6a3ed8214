//! Routes tool calls to the connection that owns the tool

use std::sync::Arc;

use serde_json::Value;

use super::error::{ToolError, ToolResult};
use super::registry::ToolConnectionRegistry;
use crate::logging::Logger;
use crate::types::Tool;

/// Executes named tools against the registry's live connections.
///
/// When several servers expose the same name, the one registered first
/// handles the call.
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolConnectionRegistry>,
    logger: Arc<dyn Logger>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolConnectionRegistry>, logger: Arc<dyn Logger>) -> Self {
        Self { registry, logger }
    }

    pub fn registry(&self) -> &Arc<ToolConnectionRegistry> {
        &self.registry
    }

    /// Tools currently offered to the model
    pub fn available_tools(&self) -> Vec<Tool> {
        self.registry.llm_tools()
    }

    /// Invoke `name` with `arguments` and return the server's raw result
    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolResult<Value> {
        let (server, session) = self
            .registry
            .find_tool_owner(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;

        self.logger.debug(&format!(
            "[ToolInvoker] Calling '{}' on '{}' with {}",
            name, server, arguments
        ));

        match session.call_tool(name, arguments).await {
            Ok(result) => Ok(result),
            Err(source) => {
                self.logger.warn(&format!(
                    "[ToolInvoker] '{}' on '{}' failed: {}",
                    name, server, source
                ));
                Err(ToolError::Execution {
                    tool: name.to_string(),
                    source,
                })
            }
        }
    }
}

//! Tool descriptor and tool-calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One invocable capability published by a connected tool server.
///
/// Names are unique within a connection but may repeat across
/// connections; `owning_connection` records which server published it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(rename = "owningConnection", default)]
    pub owning_connection: String,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema,
            owning_connection: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Tag this descriptor with the connection that published it
    pub fn owned_by(mut self, connection: impl Into<String>) -> Self {
        self.owning_connection = connection.into();
        self
    }
}

/// Tool definition as offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    pub input_schema: Value,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: Value::Object(Default::default()),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

impl From<&ToolDescriptor> for Tool {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone().unwrap_or_default(),
            input_schema: descriptor.input_schema.clone(),
        }
    }
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned identifier for this call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Key used to spot a repeated call: tool name plus serialized arguments
    pub fn dedup_key(&self) -> (String, String) {
        (self.name.clone(), self.input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_entry_defaults_description() {
        let descriptor = ToolDescriptor::new("search", json!({"type": "object"})).owned_by("web");
        let tool = Tool::from(&descriptor);
        assert_eq!(tool.name, "search");
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema, json!({"type": "object"}));

        let value = serde_json::to_value(&tool).unwrap();
        assert!(value.get("input_schema").is_some());
    }

    #[test]
    fn test_descriptor_serialization() {
        let descriptor = ToolDescriptor::new("add", json!({}))
            .with_description("Add numbers")
            .owned_by("math");
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["owningConnection"], "math");
        assert_eq!(value["inputSchema"], json!({}));
    }

    #[test]
    fn test_dedup_key_is_order_stable() {
        let a = ToolCall::new("1", "add", json!({"a": 2, "b": 2}));
        let b = ToolCall::new("2", "add", json!({"a": 2, "b": 2}));
        let c = ToolCall::new("3", "add", json!({"a": 2, "b": 3}));
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
    }
}

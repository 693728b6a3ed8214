//! Tool-server launch configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ConfigError, ConfigResult};

/// How to start one tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLaunchConfig {
    /// Executable to run
    pub command: String,
    /// Arguments, in order (required, may be empty)
    pub args: Vec<String>,
    /// Overrides merged on top of the current process environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServerLaunchConfig {
    pub fn new(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Reject configurations that cannot possibly spawn
    pub fn validate(&self, name: &str) -> ConfigResult<()> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::invalid_server(name, "command must not be empty"));
        }
        Ok(())
    }
}

/// Launch configurations keyed by server name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerConfigSet {
    servers: BTreeMap<String, ServerLaunchConfig>,
}

impl ServerConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a server definition
    pub fn insert(&mut self, name: impl Into<String>, config: ServerLaunchConfig) {
        self.servers.insert(name.into(), config);
    }

    pub fn with_server(mut self, name: impl Into<String>, config: ServerLaunchConfig) -> Self {
        self.insert(name, config);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ServerLaunchConfig> {
        self.servers.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ServerLaunchConfig> {
        self.servers.remove(name)
    }

    /// Server names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServerLaunchConfig)> {
        self.servers.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Validate every entry, failing on the first bad one
    pub fn validate(&self) -> ConfigResult<()> {
        self.iter().try_for_each(|(name, config)| config.validate(name))
    }

    /// Parse a JSON server map.
    ///
    /// Accepts either `{"name": {...}}` or the desktop-client shape
    /// `{"mcpServers": {"name": {...}}}`. Each entry is checked on its own
    /// so errors name the offending server.
    pub fn from_json(value: &Value) -> ConfigResult<Self> {
        let map = value
            .get("mcpServers")
            .unwrap_or(value)
            .as_object()
            .ok_or_else(|| ConfigError::Other("server configuration must be an object".to_string()))?;

        let mut set = Self::new();
        for (name, entry) in map {
            if !entry.get("args").is_some_and(Value::is_array) {
                return Err(ConfigError::invalid_server(name, "args must be a list of strings"));
            }
            let config: ServerLaunchConfig = serde_json::from_value(entry.clone())
                .map_err(|e| ConfigError::invalid_server(name, e.to_string()))?;
            config.validate(name)?;
            set.insert(name.clone(), config);
        }
        Ok(set)
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_rejects_blank_command() {
        let config = ServerLaunchConfig::new("  ", Vec::<String>::new());
        assert!(matches!(
            config.validate("weather"),
            Err(ConfigError::InvalidServer { ref name, .. }) if name == "weather"
        ));
        assert!(ServerLaunchConfig::new("node", ["server.js"]).validate("weather").is_ok());
    }

    #[test]
    fn test_from_json_desktop_shape() {
        let set = ServerConfigSet::from_json(&json!({
            "mcpServers": {
                "weather": {
                    "command": "node",
                    "args": ["build/index.js"],
                    "env": {"API_KEY": "abc"}
                },
                "files": {"command": "uvx", "args": []}
            }
        }))
        .unwrap();

        assert_eq!(set.len(), 2);
        let weather = set.get("weather").unwrap();
        assert_eq!(weather.args, vec!["build/index.js"]);
        assert_eq!(weather.env.get("API_KEY").map(String::as_str), Some("abc"));
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["files", "weather"]);
    }

    #[test]
    fn test_from_json_requires_args_list() {
        let missing = ServerConfigSet::from_json(&json!({"a": {"command": "node"}}));
        assert!(matches!(missing, Err(ConfigError::InvalidServer { .. })));

        let not_a_list = ServerConfigSet::from_json(&json!({"a": {"command": "node", "args": "x"}}));
        assert!(matches!(not_a_list, Err(ConfigError::InvalidServer { .. })));

        let empty_command = ServerConfigSet::from_json(&json!({"a": {"command": "", "args": []}}));
        assert!(matches!(empty_command, Err(ConfigError::InvalidServer { .. })));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            ServerConfigSet::from_json(&json!([1, 2])),
            Err(ConfigError::Other(_))
        ));
    }

    #[test]
    fn test_insert_replaces() {
        let mut set = ServerConfigSet::new()
            .with_server("a", ServerLaunchConfig::new("one", ["x"]));
        set.insert("a", ServerLaunchConfig::new("two", ["y"]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").unwrap().command, "two");
        assert!(set.remove("a").is_some());
        assert!(set.is_empty());
    }
}

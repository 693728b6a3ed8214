//! File-based configuration (YAML)
//!
//! Supports user-level (~/.config/toolchat/config.yaml) and workspace-level
//! (.config/toolchat/config.yaml) files. Storage is best-effort local state.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::server::ServerConfigSet;
use super::settings::Settings;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Model settings
    #[serde(default)]
    pub settings: Settings,

    /// Tool servers by name
    #[serde(default, alias = "mcpServers")]
    pub mcp_servers: ServerConfigSet,
}

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolchat/config.yaml)
    User,
    /// Workspace-level config (.config/toolchat/config.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// File-based configuration provider
///
/// # Example
///
/// ```no_run
/// use toolchat_core::config::FileConfigProvider;
///
/// let config = FileConfigProvider::user().load()?;
/// println!("{} tool servers configured", config.mcp_servers.len());
/// # Ok::<(), toolchat_core::config::ConfigError>(())
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (~/.config/toolchat/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        let path = config_dir.join("toolchat").join("config.yaml");
        Self::new(path, ConfigLevel::User)
    }

    /// Workspace-level config provider (.config/toolchat/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".config").join("toolchat").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_from_disk(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        let config: ConfigFile = serde_yaml::from_str(&content)?;
        config.mcp_servers.validate()?;
        Ok(config)
    }

    /// Cached config, reading the file on first use. A missing file yields defaults.
    pub fn load(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Re-read from disk, replacing the cache
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.read_from_disk()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Write `config` to disk and cache it
    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        config.mcp_servers.validate()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)?;
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    pub fn set_settings(&self, settings: Settings) -> ConfigResult<()> {
        let mut config = self.load()?;
        config.settings = settings;
        self.save(&config)
    }

    pub fn set_servers(&self, servers: ServerConfigSet) -> ConfigResult<()> {
        let mut config = self.load()?;
        config.mcp_servers = servers;
        self.save(&config)
    }

    /// Create a backup of the current config file
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }

    /// Import tool servers from a desktop-client JSON file (`{"mcpServers": {...}}`)
    pub fn import_json(&self, json: &str) -> ConfigResult<ServerConfigSet> {
        let servers = ServerConfigSet::from_json_str(json)?;
        self.set_servers(servers.clone())?;
        Ok(servers)
    }

    pub fn export_json(&self) -> ConfigResult<String> {
        let config = self.load()?;
        serde_json::to_string_pretty(&serde_json::json!({ "mcpServers": config.mcp_servers }))
            .map_err(ConfigError::from)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

//! Configuration: tool-server launch definitions and model settings
//!
//! Nothing here is global. Hosts build a [`ConfigurationHolder`] and a
//! [`ServerConfigSet`] (usually through [`FileConfigProvider`]) and pass
//! them to the registry and orchestrator.

mod error;
mod file;
mod server;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use file::{ConfigFile, ConfigLevel, FileConfigProvider};
pub use server::{ServerConfigSet, ServerLaunchConfig};
pub use settings::{ConfigurationHolder, Settings};

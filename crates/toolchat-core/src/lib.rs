//! Toolchat Core
//!
//! Tool orchestration for a chat front-end: external MCP tool servers are
//! spawned as child processes, their tools are offered to a hosted model,
//! and the model's tool requests are executed until it produces an answer.
//!
//! ## Agent loop
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolchat_core::{
//!     create_provider, ConfigurationHolder, ConnectOptions, ConversationMessage,
//!     ConversationOrchestrator, FileConfigProvider, ToolConnectionRegistry, TracingLogger,
//! };
//!
//! let logger = Arc::new(TracingLogger::new());
//! let file = FileConfigProvider::user().load()?;
//!
//! let registry = Arc::new(ToolConnectionRegistry::with_mcp(logger.clone()));
//! registry.install_configs(file.mcp_servers);
//! registry.connect_all(&ConnectOptions::default()).await;
//!
//! let config = ConfigurationHolder::shared(file.settings);
//! let provider = create_provider(&config.snapshot().provider, logger.clone());
//! let orchestrator = ConversationOrchestrator::new(provider, registry, config, logger);
//!
//! let reply = orchestrator
//!     .send_message(&[ConversationMessage::user("What's the weather in Oslo?")])
//!     .await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod providers;
pub mod mcp;
pub mod tools;
pub mod orchestrator;

// Re-export commonly used types
pub use types::{
    ChatMessage, ContentBlock, ConversationMessage, MessageContent, MessageRole, TextBlock,
    Tool, ToolCall, ToolDescriptor,
};

pub use logging::{init_tracing, LogLevel, Logger, MemoryLogger, NoOpLogger, TracingLogger};

pub use config::{
    ConfigError, ConfigFile, ConfigLevel, ConfigResult, ConfigurationHolder, FileConfigProvider,
    ServerConfigSet, ServerLaunchConfig, Settings,
};

pub use providers::{
    create_provider, ChatOptions, ChatResponse, GenaiProvider, Provider, ProviderError,
    ProviderModelConfig, ProviderResult, ResponseContent, ScriptedProvider,
};

pub use mcp::{McpClient, McpConnector, McpError, McpResult};

pub use tools::{
    Backoff, ConnectOptions, FixedBackoff, ServerSummary, ToolConnection, ToolConnectionRegistry,
    ToolConnector, ToolError, ToolInvoker, ToolResult, ToolSession,
};

pub use orchestrator::{ConversationOrchestrator, OrchestratorError, OrchestratorResult};

//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to talk to tool servers launched as child
//! processes over stdio.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolchat_core::config::ServerLaunchConfig;
//! use toolchat_core::mcp::McpClient;
//!
//! let config = ServerLaunchConfig::new("npx", ["-y", "@modelcontextprotocol/server-everything"]);
//! let client = McpClient::spawn("everything", &config, logger).await?;
//!
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("echo", json!({"message": "hi"})).await?;
//!
//! client.close().await?;
//! ```

mod client;

pub use client::{McpClient, McpConnector, McpError, McpResult};

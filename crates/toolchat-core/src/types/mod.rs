//! Core types shared by the registry, the invoker and the orchestrator
//!
//! Two message shapes live here: [`ConversationMessage`] is what callers
//! hand in and get back, [`ChatMessage`] is the collapsed form sent to
//! the model.

mod conversation;
mod message;
mod tool;

pub use conversation::{ConversationMessage, ContentBlock};
pub use message::{ChatMessage, MessageContent, MessageRole, TextBlock};
pub use tool::{Tool, ToolCall, ToolDescriptor};

//! Caller-facing conversation messages
//!
//! A [`ConversationMessage`] is never mutated once built; histories only
//! grow by appending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::message::{ChatMessage, MessageRole, TextBlock};

/// One entry in a stored conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    /// Create a message with a fresh id and the current time
    pub fn new(role: MessageRole, content: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message holding a single text block
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![ContentBlock::text(text)])
    }

    /// Create an assistant message from produced blocks
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a system message holding a single text block
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, vec![ContentBlock::text(text)])
    }

    /// Text blocks of this message, in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(ContentBlock::as_text)
    }

    /// Collapse into the model-facing shape.
    ///
    /// A single text block becomes a bare string, several become a list of
    /// text blocks. Tool blocks are dropped: the model only ever sees them
    /// as the textual summaries the orchestrator injects. Returns `None`
    /// when nothing textual is left.
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        let mut texts: Vec<&str> = self.texts().collect();
        match texts.len() {
            0 => None,
            1 => Some(ChatMessage {
                role: self.role,
                content: texts.remove(0).into(),
            }),
            _ => Some(ChatMessage::with_blocks(
                self.role,
                texts.into_iter().map(TextBlock::new).collect(),
            )),
        }
    }
}

/// A block inside a [`ConversationMessage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text { text: String },
    /// The model asked for a tool to run
    ToolUse { name: String, args: Value },
    /// Outcome of a tool run; failures carry `{"error": ...}` as result
    ToolResult {
        name: String,
        args: Value,
        result: Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use(name: impl Into<String>, args: Value) -> Self {
        ContentBlock::ToolUse {
            name: name.into(),
            args,
        }
    }

    pub fn tool_result(name: impl Into<String>, args: Value, result: Value) -> Self {
        ContentBlock::ToolResult {
            name: name.into(),
            args,
            result,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

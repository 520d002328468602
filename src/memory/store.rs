//! Conversation history storage
//!
//! Stores conversation messages with timestamps and approximate token counts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Result of a tool call, fed back to the model
    Tool,
}

/// A function invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A single message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool messages: the call this result answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For tool messages: the tool that produced the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Approximate token count for context window bookkeeping
    pub token_count: usize,
}

impl ConversationMessage {
    fn with_role(role: MessageRole, content: String) -> Self {
        let token_count = estimate_tokens(&content);

        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
            token_count,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content.into())
    }

    /// Assistant message that asks for tool calls (content may be empty)
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Self::with_role(MessageRole::Assistant, content.into());
        message.token_count += tool_calls
            .iter()
            .map(|call| estimate_tokens(&call.name) + estimate_tokens(&call.arguments.to_string()))
            .sum::<usize>();
        message.tool_calls = tool_calls;
        message
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut message = Self::with_role(MessageRole::Tool, content.into());
        message.tool_call_id = Some(tool_call_id.into());
        message.tool_name = Some(tool_name.into());
        message
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Rough 4-characters-per-token estimate
fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

/// Conversation history for one assistant session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: VecDeque<ConversationMessage>,
    /// Total token count (approximate)
    total_tokens: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            total_tokens: 0,
        }
    }

    /// Add a message to history
    pub fn add_message(&mut self, message: ConversationMessage) {
        self.total_tokens += message.token_count;
        self.messages.push_back(message);
    }

    /// Contiguous view of all messages, oldest first
    pub fn as_slice(&mut self) -> &[ConversationMessage] {
        self.messages.make_contiguous()
    }

    /// Get total token count
    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    /// Get message count
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Drop everything after the first `len` messages
    pub fn truncate(&mut self, len: usize) {
        if len >= self.messages.len() {
            return;
        }

        self.messages.truncate(len);
        self.recompute_total_tokens();
    }

    /// Recompute token count (prevents drift)
    fn recompute_total_tokens(&mut self) {
        self.total_tokens = self.messages.iter().map(|m| m.token_count).sum();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

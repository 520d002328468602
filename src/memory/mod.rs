//! Conversation memory
//!
//! Holds the ordered turns of the single long-lived conversation, including
//! the model's tool calls and the results fed back for them.

pub mod store;

pub use store::{ConversationHistory, ConversationMessage, MessageRole, ToolCall};

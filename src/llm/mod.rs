//! Chat model abstraction
//!
//! A `ChatModel` takes the system prompt, the conversation so far and the
//! tool definitions, and returns the next assistant message. That message
//! either carries tool calls or is the final answer for the turn.

pub mod gemini;
pub mod mock;
pub mod openai;

pub use gemini::GeminiClient;
pub use mock::{RecordedChat, ScriptedModel};
pub use openai::OpenAiClient;

use crate::config::{LlmConfig, LlmProvider};
use crate::memory::ConversationMessage;
use crate::models::TokenUsage;
use crate::tools::ToolDefinition;
use crate::Result;
use std::sync::Arc;

/// One completion request
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [ConversationMessage],
    pub tools: &'a [ToolDefinition],
}

/// The model's next message plus what it cost
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub message: ConversationMessage,
    pub usage: TokenUsage,
}

/// Trait for a chat-completion backend with function calling
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatReply>;
}

/// Build the configured provider
pub fn build_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    let model: Arc<dyn ChatModel> = match config.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(config.clone())?),
        LlmProvider::Gemini => Arc::new(GeminiClient::new(config.clone())?),
    };
    Ok(model)
}

/// Tool results travel to the model as JSON text; an object is required by
/// some providers, so bare values are wrapped.
pub(crate) fn tool_result_object(content: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(value) => serde_json::json!({ "result": value }),
        Err(_) => serde_json::json!({ "result": content }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_model_selects_provider() {
        let openai = build_model(&LlmConfig::new(LlmProvider::OpenAi, "sk-test")).unwrap();
        assert_eq!(openai.name(), "openai");

        let gemini = build_model(&LlmConfig::new(LlmProvider::Gemini, "g-test")).unwrap();
        assert_eq!(gemini.name(), "gemini");
    }

    #[test]
    fn test_tool_result_object() {
        assert_eq!(tool_result_object(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(tool_result_object("null"), json!({"result": null}));
        assert_eq!(tool_result_object("not json"), json!({"result": "not json"}));
    }
}

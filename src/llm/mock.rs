//! Scripted model for development & testing
//!
//! Keeps the conversation loop exercisable without a live LLM: replies are
//! played back in order and every request is recorded for inspection.

use crate::error::AssistantError;
use crate::llm::{ChatModel, ChatReply, ChatRequest};
use crate::memory::{ConversationMessage, ToolCall};
use crate::models::TokenUsage;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    ToolCalls(Vec<(String, Value)>),
    Failure(String),
}

/// What the model was shown on one call
#[derive(Debug, Clone)]
pub struct RecordedChat {
    pub system: String,
    pub messages: Vec<ConversationMessage>,
    pub tool_names: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedChat>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a final text answer
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(text.into()))
    }

    /// Queue a reply that requests the given `(tool name, arguments)` calls
    pub fn then_tool_calls(self, calls: Vec<(&str, Value)>) -> Self {
        let calls = calls
            .into_iter()
            .map(|(name, args)| (name.to_string(), args))
            .collect();
        self.push(ScriptedReply::ToolCalls(calls))
    }

    /// Queue a provider failure
    pub fn then_failure(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Failure(message.into()))
    }

    fn push(self, reply: ScriptedReply) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    pub fn requests(&self) -> Vec<RecordedChat> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|script| script.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest<'_>) -> crate::Result<ChatReply> {
        let call_index = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| AssistantError::LlmError("scripted model poisoned".to_string()))?;
            requests.push(RecordedChat {
                system: request.system.to_string(),
                messages: request.messages.to_vec(),
                tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            });
            requests.len()
        };

        let next = self
            .script
            .lock()
            .map_err(|_| AssistantError::LlmError("scripted model poisoned".to_string()))?
            .pop_front();

        let message = match next {
            Some(ScriptedReply::Text(text)) => ConversationMessage::assistant(text),
            Some(ScriptedReply::ToolCalls(calls)) => {
                let calls = calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, arguments))| ToolCall {
                        id: format!("call_{}_{}", call_index, i),
                        name,
                        arguments,
                    })
                    .collect();
                ConversationMessage::assistant_with_tool_calls("", calls)
            }
            Some(ScriptedReply::Failure(message)) => return Err(AssistantError::LlmError(message)),
            None => {
                return Err(AssistantError::LlmError(
                    "scripted model has no replies left".to_string(),
                ))
            }
        };

        let usage = TokenUsage {
            input_tokens: request.messages.iter().map(|m| m.token_count as u64).sum(),
            output_tokens: message.token_count as u64,
        };

        Ok(ChatReply { message, usage })
    }
}

//! OpenAI chat-completions client with tool calling
//!
//! Works against any OpenAI-compatible endpoint via `OPENAI_API_BASE`.

use crate::config::LlmConfig;
use crate::error::AssistantError;
use crate::llm::{ChatModel, ChatReply, ChatRequest};
use crate::memory::{ConversationMessage, MessageRole, ToolCall};
use crate::models::TokenUsage;
use crate::tools::ToolDefinition;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Reusable OpenAI client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.config.model, messages = request.messages.len()))]
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatReply> {
        let body = OpenAiRequest {
            model: self.config.model.clone(),
            messages: build_messages(request.system, request.messages),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(convert_tools(request.tools))
            },
            temperature: self.config.temperature,
        };

        debug!("Calling OpenAI chat completions");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {}", e);
                AssistantError::LlmError(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, "OpenAI error response: {}", error_text);
            return Err(AssistantError::LlmError(match status.as_u16() {
                401 => "OpenAI authentication failed (check OPENAI_API_KEY)".to_string(),
                404 => format!("OpenAI model not found: {}", self.config.model),
                429 => format!("OpenAI rate limit or quota exceeded: {}", error_text),
                _ => format!("OpenAI returned {}: {}", status, error_text),
            }));
        }

        let parsed: OpenAiResponse = response.json().await.map_err(|e| {
            AssistantError::LlmError(format!("OpenAI parse error: {}", e))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            AssistantError::LlmError("No choices in OpenAI response".to_string())
        })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "OpenAI response received"
        );

        Ok(ChatReply {
            message: parse_response_message(choice.message)?,
            usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct OpenAiMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OpenAiFunctionCall {
    name: String,
    /// JSON-encoded arguments object
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

fn function_type() -> String {
    "function".to_string()
}

/// System prompt first, then the history in OpenAI's shape.
fn build_messages(system: &str, messages: &[ConversationMessage]) -> Vec<OpenAiMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    result.push(OpenAiMessage {
        role: "system",
        content: Some(system.to_string()),
        tool_calls: None,
        tool_call_id: None,
    });

    for msg in messages {
        let converted = match msg.role {
            MessageRole::User => OpenAiMessage {
                role: "user",
                content: Some(msg.content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            MessageRole::Assistant => OpenAiMessage {
                role: "assistant",
                content: if msg.content.is_empty() && msg.has_tool_calls() {
                    None
                } else {
                    Some(msg.content.clone())
                },
                tool_calls: if msg.has_tool_calls() {
                    Some(msg.tool_calls.iter().map(to_openai_call).collect())
                } else {
                    None
                },
                tool_call_id: None,
            },
            MessageRole::Tool => OpenAiMessage {
                role: "tool",
                content: Some(msg.content.clone()),
                tool_calls: None,
                tool_call_id: msg.tool_call_id.clone(),
            },
        };
        result.push(converted);
    }

    result
}

fn to_openai_call(call: &ToolCall) -> OpenAiToolCall {
    OpenAiToolCall {
        id: call.id.clone(),
        call_type: function_type(),
        function: OpenAiFunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
        },
    }
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
    tools
        .iter()
        .map(|tool| OpenAiTool {
            tool_type: "function",
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        })
        .collect()
}

fn parse_response_message(msg: OpenAiResponseMessage) -> Result<ConversationMessage> {
    let content = msg.content.unwrap_or_default();

    if msg.tool_calls.is_empty() {
        return Ok(ConversationMessage::assistant(content));
    }

    let mut calls = Vec::with_capacity(msg.tool_calls.len());
    for call in msg.tool_calls {
        let raw = call.function.arguments.trim();
        let arguments = if raw.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(raw).map_err(|e| {
                AssistantError::LlmError(format!(
                    "Malformed arguments for tool '{}': {}",
                    call.function.name, e
                ))
            })?
        };

        calls.push(ToolCall {
            id: call.id,
            name: call.function.name,
            arguments,
        });
    }

    Ok(ConversationMessage::assistant_with_tool_calls(content, calls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_messages_with_tool_round_trip() {
        let history = vec![
            ConversationMessage::user("Buy 5 AAPL at 100"),
            ConversationMessage::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_abc".to_string(),
                    name: "buy_stock".to_string(),
                    arguments: json!({"stock_symbol": "AAPL", "number_of_stocks": 5, "limit_price": 100.0}),
                }],
            ),
            ConversationMessage::tool_result("call_abc", "buy_stock", r#"{"orderStatus":"SUCCESS"}"#),
            ConversationMessage::assistant("Done."),
        ];

        let messages = build_messages("system rules", &history);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content.as_deref(), Some("system rules"));

        let call_msg = &messages[2];
        assert_eq!(call_msg.role, "assistant");
        assert!(call_msg.content.is_none());
        let calls = call_msg.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].call_type, "function");
        assert_eq!(calls[0].function.name, "buy_stock");
        let args: serde_json::Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(args["number_of_stocks"], 5);

        assert_eq!(messages[3].role, "tool");
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_abc"));
    }

    #[test]
    fn test_request_serialization() {
        let tools = vec![ToolDefinition::new("get_instructions", "Instructions", json!({"type": "object"}))];
        let request = OpenAiRequest {
            model: "gpt-4-turbo".to_string(),
            messages: build_messages("sys", &[ConversationMessage::user("hi")]),
            tools: Some(convert_tools(&tools)),
            temperature: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "get_instructions");
        assert!(value.get("temperature").is_none());
        assert_eq!(value["messages"][1]["content"], "hi");

        let tuned = OpenAiRequest {
            model: "gpt-4-turbo".to_string(),
            messages: Vec::new(),
            tools: None,
            temperature: Some(0.5),
        };
        let value = serde_json::to_value(&tuned).unwrap();
        assert_eq!(value["temperature"], 0.5);
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_instructions", "arguments": "{\"instruction_id\": 1}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18, "total_tokens": 138}
        });

        let response: OpenAiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.usage.as_ref().unwrap().prompt_tokens, 120);

        let choice = response.choices.into_iter().next().unwrap();
        let message = parse_response_message(choice.message).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "call_1");
        assert_eq!(message.tool_calls[0].arguments, json!({"instruction_id": 1}));
    }

    #[test]
    fn test_parse_text_response() {
        let message = parse_response_message(OpenAiResponseMessage {
            content: Some("Invest in treasury bills.".to_string()),
            tool_calls: vec![],
        })
        .unwrap();
        assert!(!message.has_tool_calls());
        assert_eq!(message.content, "Invest in treasury bills.");
    }

    #[test]
    fn test_malformed_arguments_are_an_error() {
        let result = parse_response_message(OpenAiResponseMessage {
            content: None,
            tool_calls: vec![OpenAiToolCall {
                id: "call_1".to_string(),
                call_type: function_type(),
                function: OpenAiFunctionCall {
                    name: "buy_stock".to_string(),
                    arguments: "{not json".to_string(),
                },
            }],
        });
        assert!(matches!(result, Err(AssistantError::LlmError(_))));
    }
}

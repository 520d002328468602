//! Gemini API client with function calling
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! Gemini does not assign ids to function calls, so ids are minted locally
//! and function responses are matched back by name.

use crate::config::LlmConfig;
use crate::error::AssistantError;
use crate::llm::{tool_result_object, ChatModel, ChatReply, ChatRequest};
use crate::memory::{ConversationMessage, MessageRole, ToolCall};
use crate::models::TokenUsage;
use crate::tools::ToolDefinition;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    config: LlmConfig,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        )
    }
}

#[async_trait::async_trait]
impl ChatModel for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatReply> {
        let body = GeminiRequest {
            contents: build_contents(request.messages),
            system_instruction: SystemInstruction {
                parts: vec![Part::text(request.system)],
            },
            tools: if request.tools.is_empty() {
                Vec::new()
            } else {
                vec![GeminiTools {
                    function_declarations: request.tools.iter().map(FunctionDeclaration::from).collect(),
                }]
            },
            generation_config: self.config.temperature.map(|temperature| GenerationConfig { temperature }),
        };

        info!(model = %self.config.model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AssistantError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AssistantError::LlmError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AssistantError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let usage = gemini_response
            .usage_metadata
            .as_ref()
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        let message = parse_candidate(gemini_response)?;
        info!(
            tool_calls = message.tool_calls.len(),
            "Gemini response received"
        );

        Ok(ChatReply { message, usage })
    }
}

/// Map the history onto Gemini contents.
///
/// Consecutive tool results are folded into one `user` content so parallel
/// function calls get their responses in a single turn.
fn build_contents(messages: &[ConversationMessage]) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            MessageRole::User => contents.push(Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(&msg.content)],
            }),
            MessageRole::Assistant => {
                let mut parts = Vec::with_capacity(msg.tool_calls.len() + 1);
                if !msg.content.is_empty() {
                    parts.push(Part::text(&msg.content));
                }
                parts.extend(msg.tool_calls.iter().map(|call| Part {
                    function_call: Some(FunctionCall {
                        name: call.name.clone(),
                        args: call.arguments.clone(),
                    }),
                    ..Part::default()
                }));
                contents.push(Content {
                    role: Some("model".to_string()),
                    parts,
                });
            }
            MessageRole::Tool => {
                let part = Part {
                    function_response: Some(FunctionResponse {
                        name: msg.tool_name.clone().unwrap_or_default(),
                        response: tool_result_object(&msg.content),
                    }),
                    ..Part::default()
                };

                match contents.last_mut() {
                    Some(last) if last.is_function_response() => last.parts.push(part),
                    _ => contents.push(Content {
                        role: Some("user".to_string()),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    contents
}

fn parse_candidate(response: GeminiResponse) -> Result<ConversationMessage> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AssistantError::LlmError("No response from Gemini API".to_string()))?;

    let content = candidate.content.ok_or_else(|| {
        AssistantError::LlmError(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    let mut text = String::new();
    let mut calls = Vec::new();

    for part in content.parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            calls.push(ToolCall {
                id: format!("call_{}", Uuid::new_v4().simple()),
                name: call.name,
                arguments: call.args,
            });
        }
    }

    if calls.is_empty() {
        Ok(ConversationMessage::assistant(text))
    } else {
        Ok(ConversationMessage::assistant_with_tool_calls(text, calls))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn is_function_response(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|p| p.function_response.is_some())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<&ToolDefinition> for FunctionDeclaration {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use serde_json::json;

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(LlmConfig::new(LlmProvider::Gemini, "g-key")).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_serialization() {
        let tools = vec![ToolDefinition::new(
            "get_retail_sales",
            "Retail sales",
            json!({"type": "object", "properties": {"country_code": {"type": "string"}}}),
        )];
        let request = GeminiRequest {
            contents: build_contents(&[ConversationMessage::user("Treasury or retail?")]),
            system_instruction: SystemInstruction {
                parts: vec![Part::text("rules")],
            },
            tools: vec![GeminiTools {
                function_declarations: tools.iter().map(FunctionDeclaration::from).collect(),
            }],
            generation_config: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Treasury or retail?");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "rules");
        assert_eq!(
            value["tools"][0]["functionDeclarations"][0]["name"],
            "get_retail_sales"
        );
        assert!(value.get("generationConfig").is_none());

        let tuned = GeminiRequest {
            contents: Vec::new(),
            system_instruction: SystemInstruction {
                parts: vec![Part::text("rules")],
            },
            tools: Vec::new(),
            generation_config: Some(GenerationConfig { temperature: 0.5 }),
        };
        let value = serde_json::to_value(&tuned).unwrap();
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_parallel_tool_results_share_one_content() {
        let history = vec![
            ConversationMessage::user("compare"),
            ConversationMessage::assistant_with_tool_calls(
                "",
                vec![
                    ToolCall {
                        id: "call_a".to_string(),
                        name: "get_treasury_yield".to_string(),
                        arguments: json!({"country_code": "US"}),
                    },
                    ToolCall {
                        id: "call_b".to_string(),
                        name: "get_retail_sales".to_string(),
                        arguments: json!({"country_code": "US"}),
                    },
                ],
            ),
            ConversationMessage::tool_result("call_a", "get_treasury_yield", r#"{"data":[]}"#),
            ConversationMessage::tool_result("call_b", "get_retail_sales", r#"{"data":[]}"#),
        ];

        let contents = build_contents(&history);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[1].parts.len(), 2);
        assert_eq!(contents[2].parts.len(), 2);
        assert_eq!(
            contents[2].parts[1].function_response.as_ref().unwrap().name,
            "get_retail_sales"
        );
    }

    #[test]
    fn test_null_tool_result_is_wrapped() {
        let history = vec![ConversationMessage::tool_result("call_a", "get_instructions", "null")];
        let contents = build_contents(&history);
        let response = &contents[0].parts[0].function_response.as_ref().unwrap().response;
        assert_eq!(response, &json!({"result": null}));
    }

    #[test]
    fn test_parse_function_call_candidate() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "get_instructions", "args": {"instruction_id": 1}}}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 50, "candidatesTokenCount": 7}
        });

        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.usage_metadata.as_ref().unwrap().prompt_token_count, 50);

        let message = parse_candidate(response).unwrap();
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].name, "get_instructions");
        assert!(message.tool_calls[0].id.starts_with("call_"));
        assert_eq!(message.tool_calls[0].arguments["instruction_id"], 1);
    }

    #[test]
    fn test_parse_empty_candidate_is_error() {
        let response: GeminiResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        let err = parse_candidate(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parse_candidate(response).is_err());
    }
}

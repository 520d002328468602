//! Long-lived model conversation with function calling
//!
//! One `say` call is one user turn: the user message goes in, the model may
//! ask for tools any number of times (bounded), and the turn ends when the
//! model answers in plain text.

use crate::config::DEFAULT_MAX_TOOL_ROUNDS;
use crate::error::AssistantError;
use crate::execution::ExecutionEngine;
use crate::llm::{ChatModel, ChatRequest};
use crate::memory::{ConversationHistory, ConversationMessage};
use crate::models::{TokenUsage, TurnOutcome};
use crate::tools::ToolDefinition;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Conversation {
    model: Arc<dyn ChatModel>,
    engine: ExecutionEngine,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
    history: ConversationHistory,
    max_tool_rounds: usize,
    total_usage: TokenUsage,
}

impl Conversation {
    pub fn new(
        model: Arc<dyn ChatModel>,
        engine: ExecutionEngine,
        system_prompt: impl Into<String>,
    ) -> Self {
        let tools = engine.definitions();

        Self {
            model,
            engine,
            system_prompt: system_prompt.into(),
            tools,
            history: ConversationHistory::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            total_usage: TokenUsage::default(),
        }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds.max(1);
        self
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Tokens spent across every model call so far
    pub fn total_usage(&self) -> TokenUsage {
        self.total_usage
    }

    /// Run one user turn.
    ///
    /// On error the history is restored to what it was before the turn.
    pub async fn say(&mut self, input: &str) -> Result<TurnOutcome> {
        let checkpoint = self.history.message_count();

        match self.run_turn(input).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(error = %e, "Turn failed, rolling back conversation history");
                self.history.truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome> {
        self.history.add_message(ConversationMessage::user(input));

        let mut observations = Vec::new();
        let mut usage = TokenUsage::default();

        for round in 1..=self.max_tool_rounds {
            let request = ChatRequest {
                system: &self.system_prompt,
                messages: self.history.as_slice(),
                tools: &self.tools,
            };

            debug!(round, model = self.model.name(), "Requesting model reply");
            let reply = self.model.complete(request).await?;

            usage += reply.usage;
            self.total_usage += reply.usage;

            let message = reply.message;
            if !message.has_tool_calls() {
                let answer = message.content.clone();
                self.history.add_message(message);

                info!(
                    rounds = round,
                    tool_calls = observations.len(),
                    turn_tokens = usage.total(),
                    total_tokens = self.total_usage.total(),
                    history_tokens = self.history.total_tokens(),
                    "Turn complete"
                );

                return Ok(TurnOutcome {
                    answer,
                    observations,
                    usage,
                });
            }

            let calls = message.tool_calls.clone();
            self.history.add_message(message);

            let round_observations = self.engine.execute_calls(&calls).await;
            for obs in &round_observations {
                let content = serde_json::to_string(&obs.tool_output)?;
                self.history.add_message(ConversationMessage::tool_result(
                    obs.tool_call_id.clone(),
                    obs.tool_name.clone(),
                    content,
                ));
            }
            observations.extend(round_observations);
        }

        Err(AssistantError::ToolRoundsExceeded(format!(
            "model was still calling tools after {} rounds",
            self.max_tool_rounds
        )))
    }
}

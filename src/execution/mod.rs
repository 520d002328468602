//! Execution engine for model-requested tool calls
//!
//! Every call the model makes gets exactly one observation back, whatever
//! happens: providers reject a follow-up request that leaves a call id
//! unanswered.

use crate::error::AssistantError;
use crate::memory::ToolCall;
use crate::models::{ExecutionStatus, Observation, ToolInput};
use crate::tools::{ToolDefinition, ToolRegistry};
use chrono::Utc;
use serde_json::json;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum tool calls executed from a single model reply
const MAX_CALLS_PER_REPLY: usize = 16;

/// Executes tool calls against the registry, one at a time
pub struct ExecutionEngine {
    tool_registry: ToolRegistry,
}

impl ExecutionEngine {
    pub fn new(tool_registry: ToolRegistry) -> Self {
        Self { tool_registry }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tool_registry.definitions()
    }

    /// Execute all calls from one reply, in order.
    ///
    /// A failing call does not stop the ones after it.
    pub async fn execute_calls(&self, calls: &[ToolCall]) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(calls.len());

        for (index, call) in calls.iter().enumerate() {
            if index >= MAX_CALLS_PER_REPLY {
                warn!(
                    tool_name = %call.name,
                    limit = MAX_CALLS_PER_REPLY,
                    "Skipping tool call over the per-reply limit"
                );
                observations.push(observation(
                    call,
                    json!({
                        "error": format!(
                            "Too many tool calls in one reply (limit {})",
                            MAX_CALLS_PER_REPLY
                        )
                    }),
                    ExecutionStatus::Skipped,
                    0,
                ));
                continue;
            }

            observations.push(self.execute_call(call).await);
        }

        observations
    }

    /// Execute a single call, capturing any failure in the observation.
    pub async fn execute_call(&self, call: &ToolCall) -> Observation {
        debug!(
            tool_call_id = %call.id,
            tool_name = %call.name,
            "Executing tool call"
        );

        let start = Instant::now();
        let input = ToolInput {
            tool_name: call.name.clone(),
            parameters: call.arguments.clone(),
        };

        let (status, tool_output) = match self.tool_registry.invoke(&input).await {
            Ok(data) => (ExecutionStatus::Success, data),
            Err(AssistantError::ToolNotFound(name)) => {
                warn!(tool_name = %name, "Tool not registered");
                (
                    ExecutionStatus::Skipped,
                    json!({ "error": "Tool not registered" }),
                )
            }
            Err(e) => {
                warn!(tool_name = %call.name, error = %e, "Tool execution failed");
                (ExecutionStatus::Failed, json!({ "error": e.to_string() }))
            }
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            tool_name = %call.name,
            status = %status,
            execution_time_ms,
            "Tool call finished"
        );

        observation(call, tool_output, status, execution_time_ms)
    }
}

fn observation(
    call: &ToolCall,
    tool_output: serde_json::Value,
    status: ExecutionStatus,
    execution_time_ms: u64,
) -> Observation {
    Observation {
        observation_id: Uuid::new_v4(),
        tool_call_id: call.id.clone(),
        tool_name: call.name.clone(),
        tool_input: call.arguments.clone(),
        tool_output,
        execution_time_ms,
        created_at: Utc::now(),
        status,
    }
}

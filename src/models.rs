//! Core data models for the financial assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use uuid::Uuid;

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

//
// ================= Execution =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub observation_id: Uuid,
    pub tool_call_id: String,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub tool_output: serde_json::Value,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

//
// ================= Trade =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TradeResult {
    pub order_status: OrderStatus,
    pub number_of_stocks_bought: u64,
    pub total_number_of_stocks_owned: u64,
}

//
// ================= Usage =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

//
// ================= Turn Result =================
//

/// Everything one user turn produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub answer: String,
    pub observations: Vec<Observation>,
    pub usage: TokenUsage,
}

impl TurnOutcome {
    /// Tool names in the order the model invoked them
    pub fn tools_called(&self) -> Vec<&str> {
        self.observations.iter().map(|o| o.tool_name.as_str()).collect()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Success => "SUCCESS",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trade_result_wire_names() {
        let trade = TradeResult {
            order_status: OrderStatus::Success,
            number_of_stocks_bought: 5,
            total_number_of_stocks_owned: 205,
        };

        assert_eq!(
            serde_json::to_value(&trade).unwrap(),
            json!({
                "orderStatus": "SUCCESS",
                "numberOfStocksBought": 5,
                "totalNumberOfStocksOwned": 205,
            })
        );
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage += TokenUsage { input_tokens: 10, output_tokens: 4 };
        usage += TokenUsage { input_tokens: 3, output_tokens: 1 };
        assert_eq!(usage.input_tokens, 13);
        assert_eq!(usage.output_tokens, 5);
        assert_eq!(usage.total(), 18);
    }
}

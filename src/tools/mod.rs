//! Tool trait and registry
//!
//! The registry is the capability table the model calls into: each entry
//! pairs a parameter schema with a handler. Arguments are validated against
//! the schema here, before any handler runs.

pub mod schema;

pub use schema::ToolDefinition;

use crate::config::AlphaVantageConfig;
use crate::error::AssistantError;
use crate::instructions::{InstructionBook, InstructionPayload};
use crate::market_data::{AlphaVantageClient, EconomicSeries};
use crate::models::ToolInput;
use crate::trade::{simulate_buy, BuyOrder};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for a single tool the model may call
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;
    async fn execute(&self, input: &ToolInput) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool names in registration order
    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Definitions advertised to the model, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Validate `input` against the tool's schema, then run it.
    pub async fn invoke(&self, input: &ToolInput) -> Result<Value> {
        let tool = self
            .get(&input.tool_name)
            .ok_or_else(|| AssistantError::ToolNotFound(input.tool_name.clone()))?;

        schema::validate(tool.name(), &tool.parameters(), &input.parameters)?;
        tool.execute(input).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_arguments<T: DeserializeOwned>(input: &ToolInput) -> Result<T> {
    serde_json::from_value(input.parameters.clone()).map_err(|e| {
        AssistantError::InvalidToolInput(format!("{}: {}", input.tool_name, e))
    })
}

#[derive(Debug, Deserialize)]
struct InstructionArgs {
    instruction_id: serde_json::Number,
}

#[derive(Debug, Deserialize)]
struct CountryArgs {
    country_code: String,
}

/// Looks up canned instructions by id
pub struct GetInstructionsTool {
    book: InstructionBook,
}

impl GetInstructionsTool {
    pub fn new(book: InstructionBook) -> Self {
        Self { book }
    }
}

#[async_trait::async_trait]
impl Tool for GetInstructionsTool {
    fn name(&self) -> &'static str {
        "get_instructions"
    }

    fn description(&self) -> &'static str {
        "Returns the instructions you should use to execute your next step."
    }

    fn parameters(&self) -> Value {
        schema::object(
            json!({
                "instruction_id": schema::integer(
                    "The instruction id for the instruction you want to retrieve. The instruction ID to retrieve financial advisors' instructions is 1. The instruction ID to retrieve a mechanic's instructions is 2."
                ),
            }),
            &["instruction_id"],
        )
    }

    async fn execute(&self, input: &ToolInput) -> Result<Value> {
        let args: InstructionArgs = parse_arguments(input)?;

        // An unknown id is an empty answer, not a failure.
        let data = match args
            .instruction_id
            .as_i64()
            .and_then(|id| self.book.lookup(id))
        {
            Some(instruction) => serde_json::to_value(InstructionPayload::from(instruction))?,
            None => Value::Null,
        };

        Ok(data)
    }
}

/// Fetches one Alpha Vantage economic series
pub struct EconomicSeriesTool {
    series: EconomicSeries,
    client: AlphaVantageClient,
}

impl EconomicSeriesTool {
    pub fn new(series: EconomicSeries, client: AlphaVantageClient) -> Self {
        Self { series, client }
    }
}

#[async_trait::async_trait]
impl Tool for EconomicSeriesTool {
    fn name(&self) -> &'static str {
        match self.series {
            EconomicSeries::TreasuryYield => "get_treasury_yield",
            EconomicSeries::RetailSales => "get_retail_sales",
        }
    }

    fn description(&self) -> &'static str {
        match self.series {
            EconomicSeries::TreasuryYield => "Returns the history of the past 1 year's treasury yield.",
            EconomicSeries::RetailSales => "Returns the history of the past 1 year's retail sales.",
        }
    }

    fn parameters(&self) -> Value {
        let description = match self.series {
            EconomicSeries::TreasuryYield => {
                "The country code of the country where you want to get the treasury yield of"
            }
            EconomicSeries::RetailSales => {
                "The country code of the country where you want to get the retail sales of"
            }
        };

        schema::object(
            json!({ "country_code": schema::string(description) }),
            &["country_code"],
        )
    }

    async fn execute(&self, input: &ToolInput) -> Result<Value> {
        let args: CountryArgs = parse_arguments(input)?;
        self.client
            .fetch_series(self.series, &args.country_code)
            .await
    }
}

/// Simulated stock purchase
pub struct BuyStockTool;

#[async_trait::async_trait]
impl Tool for BuyStockTool {
    fn name(&self) -> &'static str {
        "buy_stock"
    }

    fn description(&self) -> &'static str {
        "Buys stock. Returns details about the trade and the stock portfolio after the trade."
    }

    fn parameters(&self) -> Value {
        schema::object(
            json!({
                "stock_symbol": schema::string("The stock trading symbol of the company you want to buy."),
                "number_of_stocks": schema::integer("The number of stocks you want to buy"),
                "limit_price": schema::number("The highest price you're willing to pay per stock"),
            }),
            &["stock_symbol", "number_of_stocks", "limit_price"],
        )
    }

    async fn execute(&self, input: &ToolInput) -> Result<Value> {
        let order: BuyOrder = parse_arguments(input)?;
        let trade = simulate_buy(&order);
        Ok(serde_json::to_value(trade)?)
    }
}

/// Registry with the four assistant tools wired to the given collaborators.
pub fn build_registry(book: InstructionBook, market_data: AlphaVantageClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(GetInstructionsTool::new(book)));
    registry.register(Arc::new(EconomicSeriesTool::new(
        EconomicSeries::TreasuryYield,
        market_data.clone(),
    )));
    registry.register(Arc::new(EconomicSeriesTool::new(
        EconomicSeries::RetailSales,
        market_data,
    )));
    registry.register(Arc::new(BuyStockTool));

    registry
}

/// Create the default registry backed by the live Alpha Vantage API.
pub fn create_default_registry(config: &AlphaVantageConfig) -> Result<ToolRegistry> {
    let market_data = AlphaVantageClient::new(config)?;
    Ok(build_registry(InstructionBook::default(), market_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::FINANCIAL_ADVISOR_INSTRUCTIONS;
    use crate::market_data::StaticTransport;

    fn registry_with(transport: StaticTransport) -> ToolRegistry {
        let config = AlphaVantageConfig::new("test-key");
        let client = AlphaVantageClient::with_transport(&config, Arc::new(transport));
        build_registry(InstructionBook::default(), client)
    }

    fn input(tool_name: &str, parameters: Value) -> ToolInput {
        ToolInput {
            tool_name: tool_name.to_string(),
            parameters,
        }
    }

    #[test]
    fn test_registry_lists_tools_in_order() {
        let registry = registry_with(StaticTransport::new());
        assert_eq!(
            registry.list(),
            vec!["get_instructions", "get_treasury_yield", "get_retail_sales", "buy_stock"]
        );

        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 4);
        assert_eq!(definitions[3].name, "buy_stock");
        assert_eq!(definitions[3].parameters["required"][1], "number_of_stocks");
    }

    #[test]
    fn test_register_same_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(BuyStockTool));
        registry.register(Arc::new(BuyStockTool));
        assert_eq!(registry.list(), vec!["buy_stock"]);
    }

    #[tokio::test]
    async fn test_get_instructions_hit_and_miss() {
        let registry = registry_with(StaticTransport::new());

        let hit = registry
            .invoke(&input("get_instructions", json!({"instruction_id": 1})))
            .await
            .unwrap();
        assert_eq!(hit["instructions"], FINANCIAL_ADVISOR_INSTRUCTIONS);

        let miss = registry
            .invoke(&input("get_instructions", json!({"instruction_id": 2})))
            .await
            .unwrap();
        assert!(miss.is_null());
    }

    #[tokio::test]
    async fn test_get_instructions_out_of_table_ids_are_null() {
        let registry = registry_with(StaticTransport::new());

        for id in [json!(-1), json!(0), json!(5_000_000_000u64), json!(u64::MAX)] {
            let output = registry
                .invoke(&input("get_instructions", json!({ "instruction_id": id.clone() })))
                .await
                .unwrap();
            assert!(output.is_null(), "id {} should have no instructions", id);
        }
    }

    #[tokio::test]
    async fn test_buy_stock_tool() {
        let registry = registry_with(StaticTransport::new());
        let output = registry
            .invoke(&input(
                "buy_stock",
                json!({"stock_symbol": "AAPL", "number_of_stocks": 5, "limit_price": 100.0}),
            ))
            .await
            .unwrap();

        assert_eq!(
            output,
            json!({"orderStatus": "SUCCESS", "numberOfStocksBought": 5, "totalNumberOfStocksOwned": 205})
        );
    }

    #[tokio::test]
    async fn test_buy_stock_rejects_negative_quantity() {
        let registry = registry_with(StaticTransport::new());
        let result = registry
            .invoke(&input(
                "buy_stock",
                json!({"stock_symbol": "AAPL", "number_of_stocks": -3, "limit_price": 100.0}),
            ))
            .await;

        assert!(matches!(result, Err(AssistantError::InvalidToolInput(_))));
    }

    #[tokio::test]
    async fn test_series_tools_pass_through() {
        let treasury = json!({"name": "Treasury", "data": [{"date": "2026-01-01", "value": "4.19"}]});
        let retail = json!({"name": "Retail", "data": [{"date": "2026-01-01", "value": "612000"}]});
        let registry = registry_with(
            StaticTransport::new()
                .with_body(EconomicSeries::TreasuryYield, treasury.clone())
                .with_body(EconomicSeries::RetailSales, retail.clone()),
        );

        let output = registry
            .invoke(&input("get_treasury_yield", json!({"country_code": "US"})))
            .await
            .unwrap();
        assert_eq!(output, treasury);

        let output = registry
            .invoke(&input("get_retail_sales", json!({"country_code": "US"})))
            .await
            .unwrap();
        assert_eq!(output, retail);
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = registry_with(StaticTransport::new());
        let result = registry.invoke(&input("sell_stock", json!({}))).await;
        assert!(matches!(result, Err(AssistantError::ToolNotFound(name)) if name == "sell_stock"));
    }

    #[tokio::test]
    async fn test_invoke_validates_before_execution() {
        let transport = Arc::new(StaticTransport::new());
        let config = AlphaVantageConfig::new("test-key");
        let client = AlphaVantageClient::with_transport(&config, transport.clone());
        let registry = build_registry(InstructionBook::default(), client);

        let result = registry
            .invoke(&input("get_treasury_yield", json!({"country_code": 840})))
            .await;

        assert!(matches!(result, Err(AssistantError::InvalidToolInput(_))));
        assert!(transport.requests().is_empty());
    }
}

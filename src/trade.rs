//! Simulated stock purchases
//!
//! No order reaches a market and nothing is remembered between calls. Every
//! confirmation is computed from the same fixed holding.

use crate::models::{OrderStatus, TradeResult};
use serde::Deserialize;
use tracing::info;

/// Holding every simulated portfolio starts from
pub const BASELINE_STOCKS_OWNED: u64 = 200;

/// Arguments the model passes to `buy_stock`
#[derive(Debug, Clone, Deserialize)]
pub struct BuyOrder {
    pub stock_symbol: String,
    pub number_of_stocks: u64,
    pub limit_price: f64,
}

/// Produce a synthetic fill for `order`.
pub fn simulate_buy(order: &BuyOrder) -> TradeResult {
    info!(
        stock_symbol = %order.stock_symbol,
        number_of_stocks = order.number_of_stocks,
        limit_price = order.limit_price,
        "Simulating stock purchase"
    );

    TradeResult {
        order_status: OrderStatus::Success,
        number_of_stocks_bought: order.number_of_stocks,
        total_number_of_stocks_owned: BASELINE_STOCKS_OWNED.saturating_add(order.number_of_stocks),
    }
}

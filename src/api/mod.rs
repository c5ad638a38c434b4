pub mod binance;

pub use binance::{BinanceClient, BinanceCredentials};

use async_trait::async_trait;

use crate::models::{AccountBalance, Candle, OrderRequest, Trade};
use crate::Result;

/// Market data and order execution for one exchange
///
/// Failures map to [`crate::BotError::DataUnavailable`] (fetch or transport
/// problems) or [`crate::BotError::OrderRejected`] (the exchange refused the order).
#[async_trait]
pub trait MarketGateway: Send + Sync {
    /// Recent candles, oldest first
    async fn fetch_candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>>;

    /// Submit an order. `request.price == None` is a market order.
    async fn place_order(&self, request: &OrderRequest) -> Result<Trade>;

    /// Account balances, used for startup diagnostics
    async fn fetch_balance(&self) -> Result<AccountBalance>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Indicator windows, vote thresholds and risk limits. Fixed for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyParameters {
    pub ma_short: usize,
    pub ma_long: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_window: usize,
    pub bb_std_multiplier: f64,
    pub stop_loss_pct: f64,   // 0.02 = 2%
    pub take_profit_pct: f64, // 0.04 = 4%
    pub trade_quantity: f64,  // In base asset units
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            ma_short: 10,
            ma_long: 20,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_window: 20,
            bb_std_multiplier: 2.0,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.04,
            trade_quantity: 0.001,
        }
    }
}

impl StrategyParameters {
    /// Candles needed before any signal other than HOLD can be produced
    pub fn warmup_candles(&self) -> usize {
        self.ma_long.max(self.rsi_period)
    }
}

/// Trading decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// Trading signal produced once per cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub action: SignalAction,
    pub confidence: f64, // Share of sub-signals agreeing with the action (0-1)
    pub quantity: Option<f64>,
    pub price: Option<f64>,
}

impl Signal {
    pub fn hold() -> Self {
        Self {
            action: SignalAction::Hold,
            confidence: 0.0,
            quantity: None,
            price: None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == SignalAction::Hold
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Order side that opens a position of this side
    pub fn entry_order(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }

    /// Order side that flattens a position of this side
    pub fn exit_order(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        }
    }
}

/// The single open trade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: PositionSide,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
}

/// Order to submit to the exchange. `price: None` means market order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: Option<f64>,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price: None,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price: Some(price),
        }
    }
}

/// Order confirmation returned by the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid, // Client order id we sent
    pub exchange_order_id: Option<u64>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: Option<f64>, // Average fill price, None if nothing filled yet
    pub fees: HashMap<String, f64>, // Commission per asset (BNB, base or quote)
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetBalance {
    pub free: f64,
    pub locked: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountBalance {
    pub assets: HashMap<String, AssetBalance>,
}

impl AccountBalance {
    /// Free balance for an asset, 0 when the account holds none
    pub fn free(&self, asset: &str) -> f64 {
        self.assets.get(asset).map(|b| b.free).unwrap_or(0.0)
    }
}

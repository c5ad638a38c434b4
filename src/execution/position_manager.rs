use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{OrderSide, Position, PositionSide, StrategyParameters, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

/// Where the single-position state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    NoPosition,
    LongOpen,
    ShortOpen,
}

impl PositionState {
    pub fn of(position: Option<&Position>) -> Self {
        match position.map(|p| p.side) {
            None => PositionState::NoPosition,
            Some(PositionSide::Long) => PositionState::LongOpen,
            Some(PositionSide::Short) => PositionState::ShortOpen,
        }
    }
}

/// Instruction to flatten the open position
#[derive(Debug, Clone, PartialEq)]
pub struct ExitDecision {
    pub reason: ExitReason,
    pub side: OrderSide,
    pub quantity: f64,
    pub trigger_price: f64, // Stop-loss or take-profit level that was crossed
}

/// Stop-loss / take-profit rules for the open position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionManager {
    stop_loss_pct: f64,
    take_profit_pct: f64,
}

impl PositionManager {
    pub fn new(stop_loss_pct: f64, take_profit_pct: f64) -> Self {
        Self {
            stop_loss_pct,
            take_profit_pct,
        }
    }

    pub fn from_params(params: &StrategyParameters) -> Self {
        Self::new(params.stop_loss_pct, params.take_profit_pct)
    }

    /// Stop-loss level for a position
    pub fn stop_loss_price(&self, position: &Position) -> f64 {
        match position.side {
            PositionSide::Long => position.entry_price * (1.0 - self.stop_loss_pct),
            PositionSide::Short => position.entry_price * (1.0 + self.stop_loss_pct),
        }
    }

    /// Take-profit level for a position
    pub fn take_profit_price(&self, position: &Position) -> f64 {
        match position.side {
            PositionSide::Long => position.entry_price * (1.0 + self.take_profit_pct),
            PositionSide::Short => position.entry_price * (1.0 - self.take_profit_pct),
        }
    }

    /// Check if the position should exit at `current_price` (returns the closing order if yes)
    ///
    /// Stop-loss is checked before take-profit.
    pub fn should_exit(&self, position: Option<&Position>, current_price: f64) -> Option<ExitDecision> {
        let position = position?;
        let stop_loss = self.stop_loss_price(position);
        let take_profit = self.take_profit_price(position);

        let (stop_hit, target_hit) = match position.side {
            PositionSide::Long => (current_price <= stop_loss, current_price >= take_profit),
            PositionSide::Short => (current_price >= stop_loss, current_price <= take_profit),
        };

        let (reason, trigger_price) = if stop_hit {
            (ExitReason::StopLoss, stop_loss)
        } else if target_hit {
            (ExitReason::TakeProfit, take_profit)
        } else {
            return None;
        };

        Some(ExitDecision {
            reason,
            side: position.side.exit_order(),
            quantity: position.quantity,
            trigger_price,
        })
    }

    /// Build the position opened by a confirmed entry order
    ///
    /// Entry price is the reported average fill, falling back to `reference_price`.
    pub fn open_from_fill(&self, trade: &Trade, reference_price: f64) -> Position {
        let side = match trade.side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        };
        let entry_price = trade
            .price
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(reference_price);

        Position {
            id: Uuid::new_v4(),
            symbol: trade.symbol.clone(),
            side,
            entry_price,
            quantity: trade.quantity,
            entry_time: trade.timestamp,
        }
    }
}

/// Unrealized P&L of the position at `current_price`
pub fn calculate_pnl(position: &Position, current_price: f64) -> f64 {
    match position.side {
        PositionSide::Long => (current_price - position.entry_price) * position.quantity,
        PositionSide::Short => (position.entry_price - current_price) * position.quantity,
    }
}

/// P&L as a fraction of the entry notional
pub fn calculate_pnl_pct(position: &Position, current_price: f64) -> f64 {
    let notional = position.entry_price * position.quantity;
    if notional == 0.0 {
        return 0.0;
    }
    calculate_pnl(position, current_price) / notional
}

/// How long the position has been open
pub fn holding_time(position: &Position, now: DateTime<Utc>) -> chrono::Duration {
    now - position.entry_time
}

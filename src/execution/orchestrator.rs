use crate::api::MarketGateway;
use crate::execution::position_manager::{
    calculate_pnl, calculate_pnl_pct, holding_time, ExitDecision, ExitReason, PositionManager,
    PositionState,
};
use crate::models::{OrderRequest, Position, PositionSide, Signal, SignalAction};
use crate::strategy::signals::validate_candles;
use crate::strategy::Strategy;
use crate::{BotError, Result};

/// State carried from one cycle to the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub position: Option<Position>,
    pub last_signal: Option<SignalAction>, // Last signal seen while flat
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Open { side: PositionSide, quantity: f64 },
    Skip,
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

/// Market and sizing settings for each cycle
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub symbol: String,
    pub timeframe: String,
    pub candle_limit: usize,
    pub trade_quantity: f64,
}

#[derive(Debug, Clone)]
pub struct ClosedPosition {
    pub position: Position,
    pub reason: ExitReason,
    pub exit_price: f64,
    pub realized_pnl: f64,
}

/// What happened during one cycle
#[derive(Debug)]
pub struct CycleReport {
    pub price: f64,
    pub signal: Option<Signal>, // None when a position stayed open
    pub decision: Option<ExecutionDecision>,
    pub closed: Option<ClosedPosition>,
    pub opened: Option<Position>,
    pub order_errors: Vec<BotError>,
}

impl CycleReport {
    fn new(price: f64) -> Self {
        Self {
            price,
            signal: None,
            decision: None,
            closed: None,
            opened: None,
            order_errors: Vec::new(),
        }
    }
}

/// Session after the cycle plus its outcome. The session is returned even on failure.
#[derive(Debug)]
pub struct CycleResult {
    pub session: Session,
    pub outcome: Result<CycleReport>,
}

/// Decide whether a fresh signal should open a position
pub fn decide_entry(session: &Session, signal: &Signal, default_quantity: f64) -> ExecutionDecision {
    let side = match signal.action {
        SignalAction::Buy => PositionSide::Long,
        SignalAction::Sell => PositionSide::Short,
        SignalAction::Hold => {
            return ExecutionDecision {
                action: ExecutionAction::Skip,
                reason: "Hold signal".to_string(),
            }
        }
    };

    if session.position.is_some() {
        return ExecutionDecision {
            action: ExecutionAction::Skip,
            reason: "Already have open position".to_string(),
        };
    }

    if session.last_signal == Some(signal.action) {
        return ExecutionDecision {
            action: ExecutionAction::Skip,
            reason: format!("Repeated {:?} signal suppressed", signal.action),
        };
    }

    ExecutionDecision {
        action: ExecutionAction::Open {
            side,
            quantity: signal.quantity.unwrap_or(default_quantity),
        },
        reason: format!(
            "{:?} signal ({:.0}% of indicators agree)",
            signal.action,
            signal.confidence * 100.0
        ),
    }
}

/// Runs one strategy cycle at a time against a market gateway
pub struct Orchestrator<G, S> {
    gateway: G,
    strategy: S,
    position_manager: PositionManager,
    settings: CycleSettings,
}

impl<G: MarketGateway, S: Strategy> Orchestrator<G, S> {
    pub fn new(gateway: G, strategy: S, position_manager: PositionManager, settings: CycleSettings) -> Self {
        Self {
            gateway,
            strategy,
            position_manager,
            settings,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Fetch, evaluate, manage the position and maybe open a new one
    pub async fn run_cycle(&self, mut session: Session) -> CycleResult {
        let outcome = self.cycle(&mut session).await;
        CycleResult { session, outcome }
    }

    async fn cycle(&self, session: &mut Session) -> Result<CycleReport> {
        let candles = self
            .gateway
            .fetch_candles(&self.settings.symbol, &self.settings.timeframe, self.settings.candle_limit)
            .await?;

        let current_price = candles
            .last()
            .map(|c| c.close)
            .ok_or_else(|| BotError::DataUnavailable("Exchange returned no candles".into()))?;
        validate_candles(&candles).map_err(|e| BotError::InvalidData(e.to_string()))?;

        let indicators = self.strategy.indicators(&candles);
        let mut report = CycleReport::new(current_price);

        if let Some(exit) = self
            .position_manager
            .should_exit(session.position.as_ref(), current_price)
        {
            self.close_position(session, exit, current_price, &mut report).await;
        }

        if session.position.is_none() {
            let signal = self.strategy.generate_signal(&candles, &indicators);
            let decision = decide_entry(session, &signal, self.settings.trade_quantity);
            tracing::debug!("Decision: {:?} - {}", decision.action, decision.reason);

            if let ExecutionAction::Open { side, quantity } = decision.action {
                tracing::info!(
                    "{:?} signal generated at {:.2} ({})",
                    signal.action,
                    current_price,
                    decision.reason
                );
                self.open_position(session, side, quantity, current_price, &mut report)
                    .await;
            }

            session.last_signal = Some(signal.action);
            report.signal = Some(signal);
            report.decision = Some(decision);
        }

        self.log_summary(session, &report);
        Ok(report)
    }

    async fn close_position(
        &self,
        session: &mut Session,
        exit: ExitDecision,
        current_price: f64,
        report: &mut CycleReport,
    ) {
        let Some(position) = session.position.clone() else {
            return;
        };

        let reason_label = match exit.reason {
            ExitReason::StopLoss => "Stop loss",
            ExitReason::TakeProfit => "Take profit",
        };
        tracing::info!(
            "{} triggered at {:.2} (level {:.2}, entry {:.2})",
            reason_label,
            current_price,
            exit.trigger_price,
            position.entry_price
        );

        let request = OrderRequest::market(&self.settings.symbol, exit.side, exit.quantity);
        match self.gateway.place_order(&request).await {
            Ok(trade) => {
                let exit_price = trade
                    .price
                    .filter(|p| p.is_finite() && *p > 0.0)
                    .unwrap_or(current_price);
                let realized_pnl = calculate_pnl(&position, exit_price);
                tracing::info!(
                    "✓ Closed {:?} position {} @ {:.2} after {} min (P&L: {:.4})",
                    position.side,
                    position.id,
                    exit_price,
                    holding_time(&position, trade.timestamp).num_minutes(),
                    realized_pnl
                );
                session.position = None;
                report.closed = Some(ClosedPosition {
                    position,
                    reason: exit.reason,
                    exit_price,
                    realized_pnl,
                });
            }
            Err(e) => {
                tracing::error!("✗ Failed to close position {}: {}", position.id, e);
                report.order_errors.push(e);
            }
        }
    }

    async fn open_position(
        &self,
        session: &mut Session,
        side: PositionSide,
        quantity: f64,
        current_price: f64,
        report: &mut CycleReport,
    ) {
        let request = OrderRequest::market(&self.settings.symbol, side.entry_order(), quantity);
        match self.gateway.place_order(&request).await {
            Ok(trade) => {
                let position = self.position_manager.open_from_fill(&trade, current_price);
                tracing::info!(
                    "✓ Opened {:?} position {} for {} {} @ {:.2} (stop {:.2}, target {:.2})",
                    position.side,
                    position.id,
                    position.quantity,
                    position.symbol,
                    position.entry_price,
                    self.position_manager.stop_loss_price(&position),
                    self.position_manager.take_profit_price(&position)
                );
                session.position = Some(position.clone());
                report.opened = Some(position);
            }
            Err(e) => {
                tracing::error!("✗ Failed to open {:?} position: {}", side, e);
                report.order_errors.push(e);
            }
        }
    }

    fn log_summary(&self, session: &Session, report: &CycleReport) {
        let signal = session
            .last_signal
            .map(|s| format!("{:?}", s))
            .unwrap_or_else(|| "-".to_string());

        match &session.position {
            Some(position) => tracing::info!(
                "Price: {:.2}, Signal: {}, Position: {:?} | Entry: {:.2} | P&L: {:.4} ({:.2}%)",
                report.price,
                signal,
                PositionState::of(Some(position)),
                position.entry_price,
                calculate_pnl(position, report.price),
                calculate_pnl_pct(position, report.price) * 100.0
            ),
            None => tracing::info!(
                "Price: {:.2}, Signal: {}, Position: {:?}",
                report.price,
                signal,
                PositionState::NoPosition
            ),
        }
    }
}

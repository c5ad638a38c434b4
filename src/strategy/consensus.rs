use super::{signals::evaluate_latest, Strategy};
use crate::indicators::{calculate_indicators, IndicatorSet};
use crate::models::{Candle, Signal, StrategyParameters};

/// Multi-indicator consensus strategy
///
/// This strategy votes with four independent sub-signals:
/// - Short/long MA crossover
/// - RSI oversold/overbought
/// - MACD/signal line crossover
/// - Close outside the Bollinger Bands
///
/// It acts only when at least two agree and none disagree.
#[derive(Debug, Clone)]
pub struct ConsensusStrategy {
    params: StrategyParameters,
}

impl ConsensusStrategy {
    pub fn new(params: StrategyParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParameters {
        &self.params
    }
}

impl Default for ConsensusStrategy {
    fn default() -> Self {
        Self::new(StrategyParameters::default())
    }
}

impl Strategy for ConsensusStrategy {
    fn indicators(&self, candles: &[Candle]) -> Vec<IndicatorSet> {
        calculate_indicators(candles, &self.params)
    }

    fn generate_signal(&self, candles: &[Candle], indicators: &[IndicatorSet]) -> Signal {
        let mut signal = evaluate_latest(candles, indicators, &self.params);
        if !signal.is_hold() {
            signal.quantity = Some(self.params.trade_quantity);
        }
        signal
    }

    fn name(&self) -> &str {
        "ConsensusStrategy"
    }

    fn min_candles_required(&self) -> usize {
        self.params.warmup_candles()
    }
}

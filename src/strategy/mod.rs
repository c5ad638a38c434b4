// Trading strategy module
pub mod consensus;
pub mod signals;

pub use consensus::ConsensusStrategy;

use crate::indicators::IndicatorSet;
use crate::models::{Candle, Signal};

/// Base trait for signal strategies
///
/// Implementations are pure: the same candles always give the same signal.
pub trait Strategy: Send + Sync {
    /// Compute the indicator series the strategy votes on
    fn indicators(&self, candles: &[Candle]) -> Vec<IndicatorSet>;

    /// Generate a trading signal for the latest candle
    fn generate_signal(&self, candles: &[Candle], indicators: &[IndicatorSet]) -> Signal;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles required before the strategy can emit BUY or SELL
    fn min_candles_required(&self) -> usize;
}

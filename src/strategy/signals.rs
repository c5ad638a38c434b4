use crate::indicators::IndicatorSet;
use crate::models::{Candle, Signal, SignalAction, StrategyParameters};

/// Number of independent sub-signals taking part in the vote
pub const SUB_SIGNAL_COUNT: usize = 4;

/// Minimum votes on one side (with none on the other) to act
pub const MIN_AGREEING_VOTES: usize = 2;

/// Contribution of a single sub-signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Buy,
    Sell,
    Abstain,
}

/// Tally of the four sub-signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub buy: usize,
    pub sell: usize,
}

impl VoteTally {
    pub fn record(&mut self, vote: Vote) {
        match vote {
            Vote::Buy => self.buy += 1,
            Vote::Sell => self.sell += 1,
            Vote::Abstain => {}
        }
    }

    /// Conservative consensus: any disagreement is a HOLD
    pub fn decision(&self) -> SignalAction {
        if self.buy >= MIN_AGREEING_VOTES && self.sell == 0 {
            SignalAction::Buy
        } else if self.sell >= MIN_AGREEING_VOTES && self.buy == 0 {
            SignalAction::Sell
        } else {
            SignalAction::Hold
        }
    }
}

/// Upward / downward crossing of `fast` through `slow` between two readings
fn crossover_vote(
    prev_fast: Option<f64>,
    prev_slow: Option<f64>,
    fast: Option<f64>,
    slow: Option<f64>,
) -> Vote {
    let (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) =
        (prev_fast, prev_slow, fast, slow)
    else {
        return Vote::Abstain;
    };

    if fast > slow && prev_fast <= prev_slow {
        Vote::Buy
    } else if fast < slow && prev_fast >= prev_slow {
        Vote::Sell
    } else {
        Vote::Abstain
    }
}

/// Short MA crossing the long MA
pub fn ma_crossover_vote(previous: &IndicatorSet, current: &IndicatorSet) -> Vote {
    crossover_vote(previous.ma_short, previous.ma_long, current.ma_short, current.ma_long)
}

/// RSI below oversold / above overbought
pub fn rsi_vote(current: &IndicatorSet, params: &StrategyParameters) -> Vote {
    match current.rsi {
        Some(rsi) if rsi < params.rsi_oversold => Vote::Buy,
        Some(rsi) if rsi > params.rsi_overbought => Vote::Sell,
        _ => Vote::Abstain,
    }
}

/// MACD line crossing its signal line
pub fn macd_crossover_vote(previous: &IndicatorSet, current: &IndicatorSet) -> Vote {
    crossover_vote(previous.macd, previous.macd_signal, current.macd, current.macd_signal)
}

/// Close breaking out of the Bollinger Bands
pub fn bollinger_vote(current: &IndicatorSet, candle: &Candle) -> Vote {
    match (current.bb_lower, current.bb_upper) {
        (Some(lower), _) if candle.close < lower => Vote::Buy,
        (_, Some(upper)) if candle.close > upper => Vote::Sell,
        _ => Vote::Abstain,
    }
}

/// Collect the four sub-signal votes
pub fn tally_votes(
    previous: &IndicatorSet,
    current: &IndicatorSet,
    candle: &Candle,
    params: &StrategyParameters,
) -> VoteTally {
    let mut tally = VoteTally::default();
    tally.record(ma_crossover_vote(previous, current));
    tally.record(rsi_vote(current, params));
    tally.record(macd_crossover_vote(previous, current));
    tally.record(bollinger_vote(current, candle));
    tally
}

/// Turn the latest two indicator readings into a signal
///
/// `candle_count` is the length of the series the readings came from; anything
/// shorter than the warm-up returns HOLD without looking at the indicators.
pub fn generate_signal(
    candle_count: usize,
    previous: &IndicatorSet,
    current: &IndicatorSet,
    candle: &Candle,
    params: &StrategyParameters,
) -> Signal {
    if candle_count < params.warmup_candles().max(2) {
        return Signal::hold();
    }

    let tally = tally_votes(previous, current, candle, params);
    let action = tally.decision();

    tracing::debug!(
        "Votes: buy={} sell={} -> {:?} (MA {:?}/{:?}, RSI {:?}, MACD {:?}/{:?}, BB {:?}..{:?})",
        tally.buy,
        tally.sell,
        action,
        current.ma_short,
        current.ma_long,
        current.rsi,
        current.macd,
        current.macd_signal,
        current.bb_lower,
        current.bb_upper
    );

    let agreeing = match action {
        SignalAction::Buy => tally.buy,
        SignalAction::Sell => tally.sell,
        SignalAction::Hold => return Signal::hold(),
    };

    Signal {
        action,
        confidence: agreeing as f64 / SUB_SIGNAL_COUNT as f64,
        quantity: None,
        price: Some(candle.close),
    }
}

/// Evaluate the latest candle of a full series
pub fn evaluate_latest(
    candles: &[Candle],
    indicators: &[IndicatorSet],
    params: &StrategyParameters,
) -> Signal {
    let n = candles.len().min(indicators.len());
    if n < 2 {
        return Signal::hold();
    }

    generate_signal(
        candles.len(),
        &indicators[n - 2],
        &indicators[n - 1],
        &candles[n - 1],
        params,
    )
}

/// Check that candles are usable: finite non-negative values, strictly increasing time
///
/// # Returns
/// * `Ok(())` if every candle passes
/// * `Err` describing the first offending candle
pub fn validate_candles(candles: &[Candle]) -> anyhow::Result<()> {
    for (i, candle) in candles.iter().enumerate() {
        let values = [candle.open, candle.high, candle.low, candle.close, candle.volume];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            anyhow::bail!("Candle {} at {} has non-finite or negative values", i, candle.timestamp);
        }
    }

    for window in candles.windows(2) {
        if window[1].timestamp <= window[0].timestamp {
            anyhow::bail!(
                "Candles are not in increasing time order ({} followed by {})",
                window[0].timestamp.format("%Y-%m-%d %H:%M:%S"),
                window[1].timestamp.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    Ok(())
}

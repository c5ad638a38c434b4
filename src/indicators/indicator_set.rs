use super::{bollinger_series, calculate_macd_series, rsi_series, sma_series};
use crate::models::{Candle, StrategyParameters};

/// Indicator values for one candle. `None` while the lookback window is still filling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
}

/// Compute every indicator for every candle
///
/// Output is aligned by index with `candles`; entry `i` only looks at candles `0..=i`.
pub fn calculate_indicators(candles: &[Candle], params: &StrategyParameters) -> Vec<IndicatorSet> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let ma_short = sma_series(&closes, params.ma_short);
    let ma_long = sma_series(&closes, params.ma_long);
    let rsi = rsi_series(&closes, params.rsi_period);
    let macd = calculate_macd_series(&closes, params.macd_fast, params.macd_slow, params.macd_signal);
    let bands = bollinger_series(&closes, params.bb_window, params.bb_std_multiplier);

    (0..closes.len())
        .map(|i| IndicatorSet {
            ma_short: ma_short[i],
            ma_long: ma_long[i],
            rsi: rsi[i],
            macd: Some(macd[i].macd),
            macd_signal: Some(macd[i].signal),
            macd_histogram: Some(macd[i].histogram),
            bb_middle: bands[i].map(|b| b.middle),
            bb_upper: bands[i].map(|b| b.upper),
            bb_lower: bands[i].map(|b| b.lower),
        })
        .collect()
}

use super::moving_average::ema_series;

/// One MACD reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line, signal line and histogram aligned with `prices`
///
/// Line = EMA(fast) - EMA(slow), signal = EMA(line, signal_span).
pub fn calculate_macd_series(
    prices: &[f64],
    fast_span: usize,
    slow_span: usize,
    signal_span: usize,
) -> Vec<MacdPoint> {
    let fast = ema_series(prices, fast_span);
    let slow = ema_series(prices, slow_span);

    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, signal_span);

    line.iter()
        .zip(&signal)
        .map(|(&macd, &signal)| MacdPoint {
            macd,
            signal,
            histogram: macd - signal,
        })
        .collect()
}

/// Calculate Simple Moving Average (SMA) of the most recent `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Rolling SMA aligned with `prices`. `None` until the window is full.
pub fn sma_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| calculate_sma(&prices[..=i], period))
        .collect()
}

/// Exponential Moving Average aligned with `values`
///
/// Recursive smoothing with alpha = 2 / (span + 1), seeded from the first value
/// rather than from an SMA, so every index has a value.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut ema: Option<f64> = None;
    for &value in values {
        let next = match ema {
            None => value,
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
        };
        ema = Some(next);
        out.push(next);
    }

    out
}

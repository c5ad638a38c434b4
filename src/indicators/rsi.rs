/// RSI when the window had no losses and no gains
pub const FLAT_RSI: f64 = 50.0;

/// Calculate Relative Strength Index (RSI) for the latest price
///
/// Average gain and loss are simple means of the last `period` price changes.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// Zero losses saturate at 100. A flat window (no gains, no losses) is 50.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period - 1..];

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += -change;
        }
    }

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    Some(rsi_from_averages(avg_gain, avg_loss))
}

/// Rolling RSI aligned with `prices`. First defined at index `period`.
pub fn rsi_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| calculate_rsi(&prices[..=i], period))
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // RS is infinite (or 0/0 for a flat window)
        return if avg_gain == 0.0 { FLAT_RSI } else { 100.0 };
    }

    let rs = avg_gain / avg_loss;
    (100.0 - (100.0 / (1.0 + rs))).clamp(0.0, 100.0)
}

use super::moving_average::calculate_sma;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Sample standard deviation (n - 1) of the most recent `period` prices
pub fn calculate_std_dev(prices: &[f64], period: usize) -> Option<f64> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (period - 1) as f64;

    Some(variance.sqrt())
}

/// Bollinger Bands for the latest price: SMA +/- `multiplier` standard deviations
pub fn calculate_bollinger(prices: &[f64], period: usize, multiplier: f64) -> Option<BollingerBands> {
    let middle = calculate_sma(prices, period)?;
    let width = calculate_std_dev(prices, period)? * multiplier;

    Some(BollingerBands {
        middle,
        upper: middle + width,
        lower: middle - width,
    })
}

/// Rolling Bollinger Bands aligned with `prices`
pub fn bollinger_series(prices: &[f64], period: usize, multiplier: f64) -> Vec<Option<BollingerBands>> {
    (0..prices.len())
        .map(|i| calculate_bollinger(&prices[..=i], period, multiplier))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_dev_sample() {
        // mean 5, squared deviations sum 32, n - 1 = 7
        let prices = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = calculate_std_dev(&prices, 8).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_bands_collapse_on_flat_prices() {
        let prices = vec![100.0; 20];
        let bands = calculate_bollinger(&prices, 20, 2.0).unwrap();

        assert_eq!(bands.middle, 100.0);
        assert_eq!(bands.upper, 100.0);
        assert_eq!(bands.lower, 100.0);
    }

    #[test]
    fn test_bands_symmetric() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let bands = calculate_bollinger(&prices, 20, 2.0).unwrap();

        assert!(bands.upper > bands.middle && bands.middle > bands.lower);
        assert!(((bands.upper - bands.middle) - (bands.middle - bands.lower)).abs() < 1e-9);
    }

    #[test]
    fn test_series_warmup() {
        let prices: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let series = bollinger_series(&prices, 20, 2.0);

        assert!(series[..19].iter().all(Option::is_none));
        assert!(series[19..].iter().all(Option::is_some));
    }
}

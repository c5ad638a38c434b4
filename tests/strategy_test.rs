use chrono::{Duration, TimeZone, Utc};
use signalbot::indicators::{calculate_indicators, calculate_rsi, calculate_sma};
use signalbot::strategy::signals::{ma_crossover_vote, tally_votes, Vote};
use signalbot::strategy::{ConsensusStrategy, Strategy};
use signalbot::{Candle, SignalAction, StrategyParameters};

fn candles(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start + Duration::minutes(5 * i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000.0,
        })
        .collect()
}

fn uptrend() -> Vec<f64> {
    (0..30).map(|i| 100.0 + i as f64).collect()
}

/// 30-bar rally that starts rolling over: overbought RSI and MACD crossing down
fn rollover_closes() -> Vec<f64> {
    let mut closes = uptrend();
    closes.extend([128.0, 127.0, 126.0]);
    closes
}

/// Same rally followed by a steep sell-off: oversold RSI and a close under the lower band
fn selloff_closes() -> Vec<f64> {
    let mut closes = uptrend();
    closes.extend((1..=8).map(|k| 129.0 - 3.0 * k as f64));
    closes
}

fn evaluate(closes: &[f64]) -> signalbot::Signal {
    let strategy = ConsensusStrategy::default();
    let candles = candles(closes);
    let indicators = strategy.indicators(&candles);
    strategy.generate_signal(&candles, &indicators)
}

#[test]
fn test_short_history_always_holds() {
    for len in [0, 1, 5, 19] {
        let closes: Vec<f64> = (0..len).map(|i| 100.0 + (i as f64 * 7.0) % 13.0).collect();
        assert_eq!(evaluate(&closes).action, SignalAction::Hold, "len {}", len);
    }
}

#[test]
fn test_rollover_generates_sell() {
    let signal = evaluate(&rollover_closes());

    assert_eq!(signal.action, SignalAction::Sell);
    assert_eq!(signal.confidence, 0.5);
    assert_eq!(signal.price, Some(126.0));
    assert_eq!(signal.quantity, Some(0.001));
}

#[test]
fn test_rollover_one_bar_early_holds() {
    // RSI is already overbought but MACD has not crossed yet
    let mut closes = rollover_closes();
    closes.pop();
    assert_eq!(evaluate(&closes).action, SignalAction::Hold);
}

#[test]
fn test_selloff_generates_buy() {
    let signal = evaluate(&selloff_closes());

    assert_eq!(signal.action, SignalAction::Buy);
    assert_eq!(signal.confidence, 0.5);
    assert_eq!(signal.price, Some(105.0));
}

#[test]
fn test_disagreeing_votes_hold() {
    // One bar earlier the MA crossover votes SELL against RSI and Bollinger BUY votes
    let mut closes = selloff_closes();
    closes.pop();

    let params = StrategyParameters::default();
    let candles = candles(&closes);
    let indicators = calculate_indicators(&candles, &params);
    let n = candles.len();
    let tally = tally_votes(&indicators[n - 2], &indicators[n - 1], &candles[n - 1], &params);

    assert_eq!(tally.buy, 2);
    assert_eq!(tally.sell, 1);
    assert_eq!(evaluate(&closes).action, SignalAction::Hold);
}

#[test]
fn test_ma_crossover_only_on_crossing_bar() {
    // Short MA stays above the long MA until the collapse on the last bar
    let mut closes: Vec<f64> = (0..24).map(|i| 100.0 + i as f64).collect();
    closes.push(20.0);

    let params = StrategyParameters::default();
    let indicators = calculate_indicators(&candles(&closes), &params);

    for i in 1..indicators.len() - 1 {
        assert_eq!(ma_crossover_vote(&indicators[i - 1], &indicators[i]), Vote::Abstain, "bar {}", i);
    }
    let last = indicators.len() - 1;
    assert_eq!(ma_crossover_vote(&indicators[last - 1], &indicators[last]), Vote::Sell);
}

#[test]
fn test_rsi_stays_in_range() {
    let series: [Vec<f64>; 3] = [
        (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 15.0).collect(),
        (0..60).map(|i| 1000.0 - i as f64 * 9.5).collect(),
        (0..60).map(|i| if i % 2 == 0 { 50.0 } else { 51.0 }).collect(),
    ];

    for closes in &series {
        for end in 15..=closes.len() {
            let rsi = calculate_rsi(&closes[..end], 14).unwrap();
            assert!((0.0..=100.0).contains(&rsi), "rsi {} out of range", rsi);
        }
    }
}

#[test]
fn test_constant_series_is_neutral() {
    let closes = vec![42.0; 50];
    let params = StrategyParameters::default();
    let indicators = calculate_indicators(&candles(&closes), &params);
    let last = indicators.last().unwrap();

    assert_eq!(calculate_sma(&closes, 10), Some(42.0));
    assert_eq!(last.ma_short, Some(42.0));
    assert_eq!(last.ma_long, Some(42.0));
    assert_eq!(last.rsi, Some(50.0));
    assert_eq!(last.macd, Some(0.0));
    assert_eq!(last.bb_upper, Some(42.0));
    assert_eq!(last.bb_lower, Some(42.0));
    assert_eq!(evaluate(&closes).action, SignalAction::Hold);
}

#[test]
fn test_evaluation_is_deterministic() {
    let strategy = ConsensusStrategy::default();
    let candles = candles(&selloff_closes());

    let first = strategy.indicators(&candles);
    let second = strategy.indicators(&candles);
    assert_eq!(first, second);
    assert_eq!(
        strategy.generate_signal(&candles, &first),
        strategy.generate_signal(&candles, &second)
    );
}

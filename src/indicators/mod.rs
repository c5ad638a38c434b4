// Technical indicators module
// Implements MA, RSI, MACD and Bollinger Bands over close prices

pub mod bollinger;
pub mod indicator_set;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use bollinger::{bollinger_series, calculate_bollinger, calculate_std_dev, BollingerBands};
pub use indicator_set::{calculate_indicators, IndicatorSet};
pub use macd::{calculate_macd_series, MacdPoint};
pub use moving_average::{calculate_sma, ema_series, sma_series};
pub use rsi::{calculate_rsi, rsi_series};

use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::time::Duration;

use crate::execution::{CycleSettings, LoopTiming};
use crate::models::StrategyParameters;
use crate::{BotError, Result};

/// Environment variable prefix, e.g. `SIGNALBOT_SYMBOL`, `SIGNALBOT_STRATEGY__MA_SHORT`
pub const ENV_PREFIX: &str = "SIGNALBOT";

/// Runtime configuration, loaded once at startup
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub symbol: String,
    pub timeframe: String,
    pub candle_limit: usize,
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub sandbox: bool, // Binance spot testnet when true
    pub requests_per_minute: u32,
    pub log_file: Option<String>,
    pub strategy: StrategyParameters,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: "5m".to_string(),
            candle_limit: 100,
            poll_interval_secs: 300,
            error_backoff_secs: 30,
            sandbox: true,
            requests_per_minute: 600,
            log_file: None,
            strategy: StrategyParameters::default(),
        }
    }
}

impl BotConfig {
    /// Defaults, then the optional TOML file, then `SIGNALBOT_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`BotConfig::load`] with an explicit environment map instead of the process environment
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: BotConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the strategy cannot run with
    pub fn validate(&self) -> Result<()> {
        let s = &self.strategy;

        if self.symbol.trim().is_empty() {
            return Err(BotError::Config("symbol must not be empty".into()));
        }
        if self.candle_limit < s.warmup_candles().max(2) {
            return Err(BotError::Config(format!(
                "candle_limit {} is below the {} candles needed for warm-up",
                self.candle_limit,
                s.warmup_candles()
            )));
        }
        if self.poll_interval_secs == 0 || self.requests_per_minute == 0 {
            return Err(BotError::Config(
                "poll_interval_secs and requests_per_minute must be positive".into(),
            ));
        }

        let windows = [
            ("ma_short", s.ma_short),
            ("ma_long", s.ma_long),
            ("rsi_period", s.rsi_period),
            ("macd_fast", s.macd_fast),
            ("macd_slow", s.macd_slow),
            ("macd_signal", s.macd_signal),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, w)| *w == 0) {
            return Err(BotError::Config(format!("{} must be positive", name)));
        }
        if s.bb_window < 2 {
            return Err(BotError::Config("bb_window must be at least 2".into()));
        }
        if s.ma_short >= s.ma_long {
            return Err(BotError::Config("ma_short must be shorter than ma_long".into()));
        }
        if s.macd_fast >= s.macd_slow {
            return Err(BotError::Config("macd_fast must be shorter than macd_slow".into()));
        }
        if !(0.0..=100.0).contains(&s.rsi_oversold)
            || !(0.0..=100.0).contains(&s.rsi_overbought)
            || s.rsi_oversold >= s.rsi_overbought
        {
            return Err(BotError::Config(
                "RSI thresholds must lie in [0, 100] with oversold below overbought".into(),
            ));
        }
        if s.bb_std_multiplier.is_nan() || s.bb_std_multiplier <= 0.0 {
            return Err(BotError::Config("bb_std_multiplier must be positive".into()));
        }
        for (name, pct) in [("stop_loss_pct", s.stop_loss_pct), ("take_profit_pct", s.take_profit_pct)] {
            if pct.is_nan() || pct <= 0.0 || pct >= 1.0 {
                return Err(BotError::Config(format!("{} must be between 0 and 1", name)));
            }
        }
        if !s.trade_quantity.is_finite() || s.trade_quantity <= 0.0 {
            return Err(BotError::Config("trade_quantity must be positive".into()));
        }

        Ok(())
    }

    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe.clone(),
            candle_limit: self.candle_limit,
            trade_quantity: self.strategy.trade_quantity,
        }
    }

    pub fn loop_timing(&self) -> LoopTiming {
        LoopTiming {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
        }
    }

    /// Quote asset of the pair (`USDT` for `BTC/USDT`)
    pub fn quote_asset(&self) -> Option<&str> {
        self.symbol.split('/').nth(1)
    }
}

use anyhow::Context;
use clap::Parser;
use signalbot::api::{BinanceClient, BinanceCredentials};
use signalbot::config::BotConfig;
use signalbot::execution::{connection_check, run_loop, Orchestrator, PositionManager, Session};
use signalbot::strategy::{ConsensusStrategy, Strategy};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "signalbot=info";

/// Single-pair Binance trading bot driven by an MA / RSI / MACD / Bollinger consensus
#[derive(Debug, Parser)]
#[command(name = "signalbot", version, about)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trade on the live exchange instead of the spot testnet
    #[arg(long)]
    live: bool,

    /// Seconds between strategy cycles
    #[arg(short, long)]
    interval: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = BotConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.live {
        config.sandbox = false;
    }
    if let Some(interval) = cli.interval {
        config.poll_interval_secs = interval;
    }
    if let Some(path) = &cli.log_file {
        config.log_file = Some(path.display().to_string());
    }
    config.validate().context("Invalid configuration")?;

    setup_logging(config.log_file.as_deref())?;

    tracing::info!("🚀 signalbot starting");
    log_configuration(&config);

    let client = BinanceClient::new(config.sandbox, credentials_from_env(), config.requests_per_minute)?;

    connection_check(&client, config.quote_asset().unwrap_or("USDT"))
        .await
        .context("Connection check failed: could not fetch account balance")?;

    let strategy = ConsensusStrategy::new(config.strategy.clone());
    tracing::info!(
        "Strategy: {} (needs {} candles)",
        strategy.name(),
        strategy.min_candles_required()
    );

    let orchestrator = Orchestrator::new(
        client,
        strategy,
        PositionManager::from_params(&config.strategy),
        config.cycle_settings(),
    );

    let session = if cli.once {
        let result = orchestrator.run_cycle(Session::default()).await;
        if let Err(e) = &result.outcome {
            tracing::error!("Cycle failed: {}", e);
        }
        result.session
    } else {
        tracing::info!("Press Ctrl+C to stop...");
        run_loop(&orchestrator, Session::default(), config.loop_timing(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    };

    if let Some(position) = &session.position {
        tracing::warn!(
            "Stopping with an open {:?} position: {} {} @ {:.2}",
            position.side,
            position.quantity,
            position.symbol,
            position.entry_price
        );
    }

    tracing::info!("👋 signalbot stopped");
    Ok(())
}

fn setup_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

fn credentials_from_env() -> Option<BinanceCredentials> {
    let api_key = std::env::var("BINANCE_API_KEY").ok().filter(|k| !k.is_empty())?;
    let api_secret = std::env::var("BINANCE_API_SECRET").ok().filter(|s| !s.is_empty())?;
    Some(BinanceCredentials { api_key, api_secret })
}

fn log_configuration(config: &BotConfig) {
    let s = &config.strategy;
    tracing::info!("📊 Configuration:");
    tracing::info!(
        "  Pair: {} ({}) on {}",
        config.symbol,
        config.timeframe,
        if config.sandbox { "testnet" } else { "LIVE" }
    );
    tracing::info!("  Trade quantity: {}", s.trade_quantity);
    tracing::info!(
        "  Stop loss: {}% | Take profit: {}%",
        s.stop_loss_pct * 100.0,
        s.take_profit_pct * 100.0
    );
    tracing::info!(
        "  MA {}/{} | RSI {} ({}/{}) | MACD {}/{}/{} | BB {} x{}",
        s.ma_short,
        s.ma_long,
        s.rsi_period,
        s.rsi_oversold,
        s.rsi_overbought,
        s.macd_fast,
        s.macd_slow,
        s.macd_signal,
        s.bb_window,
        s.bb_std_multiplier
    );
    tracing::info!(
        "  Poll interval: {}s (error backoff {}s)",
        config.poll_interval_secs,
        config.error_backoff_secs
    );
}

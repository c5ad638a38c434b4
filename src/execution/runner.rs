use std::future::Future;
use tokio::time::{sleep, Duration};

use super::orchestrator::{Orchestrator, Session};
use crate::api::MarketGateway;
use crate::models::AccountBalance;
use crate::strategy::Strategy;
use crate::Result;

/// Sleep durations between cycles
#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    pub poll_interval: Duration,
    pub error_backoff: Duration, // After unexpected (non-transient) failures
}

/// Startup balance diagnostic
///
/// Transient failures are logged and yield `Ok(None)` so the bot still starts;
/// anything else (missing credentials) is returned.
pub async fn connection_check<G: MarketGateway>(gateway: &G, quote_asset: &str) -> Result<Option<AccountBalance>> {
    match gateway.fetch_balance().await {
        Ok(balance) => {
            tracing::info!(
                "Connected. Balance: {:.2} {} available",
                balance.free(quote_asset),
                quote_asset
            );
            Ok(Some(balance))
        }
        Err(e) if e.is_transient() => {
            tracing::warn!("Connection check failed, continuing: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run cycles until `shutdown` resolves; returns the final session
///
/// Shutdown is observed between cycles only. A cycle in flight always completes.
pub async fn run_loop<G, S, F>(
    orchestrator: &Orchestrator<G, S>,
    mut session: Session,
    timing: LoopTiming,
    shutdown: F,
) -> Session
where
    G: MarketGateway,
    S: Strategy,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycle: u64 = 0;

    loop {
        cycle += 1;
        tracing::debug!("Cycle {} starting", cycle);

        let result = orchestrator.run_cycle(session).await;
        session = result.session;

        let delay = match &result.outcome {
            Ok(_) => timing.poll_interval,
            Err(e) if e.is_transient() => {
                tracing::warn!("Cycle {} skipped: {}", cycle, e);
                timing.poll_interval
            }
            Err(e) => {
                tracing::error!(
                    "Cycle {} failed unexpectedly: {} (backing off {}s)",
                    cycle,
                    e,
                    timing.error_backoff.as_secs()
                );
                timing.error_backoff
            }
        };

        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Stop requested after {} cycles", cycle);
                break;
            }
            _ = sleep(delay) => {}
        }
    }

    session
}

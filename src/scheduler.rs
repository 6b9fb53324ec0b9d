//! Recurring invocation of the monitoring cycle.
//!
//! Cycles run strictly sequentially on one task: a new cycle can never start
//! while the previous one is in flight. Triggers that fire during a running
//! cycle are skipped rather than queued, and the overrun is logged.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::monitor::cycle::MonitorCycle;

/// Runs monitoring cycles at the given interval until cancellation. The
/// first cycle starts immediately.
pub async fn run_scheduler(
    interval: Duration,
    cancellation_token: CancellationToken,
    cycle: &mut MonitorCycle,
) {
    let mut ticker = tokio::time::interval(interval);
    // Triggers that fire mid-cycle are dropped, not replayed in a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval_secs = interval.as_secs(), "Scheduler started");

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("Scheduler received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                tracing::info!("Monitoring cycle starting");
                let started = tokio::time::Instant::now();
                cycle.run().await;
                let elapsed = started.elapsed();
                if elapsed > interval {
                    tracing::warn!(
                        elapsed_secs = elapsed.as_secs(),
                        "Monitoring cycle overran the polling interval; overlapping triggers skipped"
                    );
                }
            }
        }
    }
}

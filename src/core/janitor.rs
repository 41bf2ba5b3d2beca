use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::core::engine::MatchingEngine;

/// Periodic sweep evicting requests that outlived the hard wait limit.
///
/// The per-request expiry timers are the fast path; this sweep is the durable
/// guarantee that no request survives past `max_wait` even when a timer is
/// lost (e.g. across a restart).
pub fn spawn_janitor(engine: Arc<MatchingEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately; skip it so a
        // freshly started engine is not swept at startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = engine.evict_expired();
            if evicted > 0 {
                tracing::info!("janitor evicted {} stale request(s)", evicted);
            } else {
                tracing::trace!("janitor sweep found nothing to evict");
            }
        }
    })
}

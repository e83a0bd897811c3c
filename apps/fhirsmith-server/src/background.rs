//! Cache-sweep background task (spec §4.7): every five minutes, evict
//! expired resource-cache entries and apply the expansion cache's
//! memory-threshold eviction, across every configured endpoint.

use std::time::Duration;

use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub async fn run(state: AppState) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        state.sweep_caches();
    }
}

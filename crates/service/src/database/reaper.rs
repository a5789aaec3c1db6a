use std::time::Duration;

use tokio::sync::watch;

use super::SqliteKvStore;

/// How often expired rows are purged from disk
pub const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically delete expired rows until `shutdown_rx` fires.
pub async fn run_reaper(store: SqliteKvStore, every: Duration, mut shutdown_rx: watch::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.reap_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "reaped expired entries"),
                    Err(e) => tracing::error!("failed to reap expired entries: {}", e),
                }
            }
            _ = shutdown_rx.changed() => {
                tracing::debug!("reaper shutting down");
                break;
            }
        }
    }
}

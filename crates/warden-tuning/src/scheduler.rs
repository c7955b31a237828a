//! Background loops driven by a fixed interval.
//!
//! Jobs are synchronous (they talk to SQLite) and run on the blocking pool.
//! The first tick fires one full period after spawn. A loop exits when the
//! shutdown flag turns true or its sender is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::tuner::Tuner;

/// Run `tuner.run_cycle()` every `interval` until shutdown.
pub fn spawn_tuner(
    tuner: Arc<Tuner>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_periodic("tuner", interval, shutdown, move || {
        if let Err(error) = tuner.run_cycle() {
            tracing::warn!(%error, "tuning cycle failed");
        }
    })
}

/// Run `job` every `period` until shutdown. Missed ticks are skipped rather
/// than replayed.
pub fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + Sync + 'static,
{
    let job = Arc::new(job);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;
        tracing::debug!(loop_name = name, period_ms = period.as_millis() as u64, "loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let job = Arc::clone(&job);
                    if let Err(error) = tokio::task::spawn_blocking(move || job()).await {
                        tracing::error!(loop_name = name, %error, "periodic job panicked");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(loop_name = name, "loop stopped");
    })
}

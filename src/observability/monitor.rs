//! Periodic connection handler report.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::ShutdownSignal;
use crate::net::ConnectionTracker;

/// Logs the number of live connection handlers at a fixed interval.
pub struct Monitor {
    tracker: ConnectionTracker,
    interval: Duration,
}

impl Monitor {
    pub fn new(tracker: ConnectionTracker, interval: Duration) -> Self {
        Self { tracker, interval }
    }

    /// Report until shutdown. Returns at once when the interval is zero.
    pub async fn run(self, shutdown: ShutdownSignal) {
        if self.interval.is_zero() {
            tracing::info!("Connection handler monitor disabled");
            return;
        }

        tracing::debug!(interval = ?self.interval, "Connection handler monitor starting");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    tracing::debug!("Connection handler monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    tracing::info!(
                        active = self.tracker.active_count(),
                        busy = self.tracker.busy_count(),
                        "Active connection handlers"
                    );
                }
            }
        }
    }
}

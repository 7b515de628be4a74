//! # Refresh Scheduler
//!
//! Periodically settles lapsed timers for every account.
//!
//! ## Architecture
//!
//! ```text
//!   tick(interval) ──┐
//!                    ├──> [Refresh Thread] ──> engine.refresh_all(clock.now())
//!   shutdown ────────┘
//! ```
//!
//! `refresh_all` is idempotent and works from absolute time, so a late,
//! skipped or doubled tick only delays what a display shows. `purchase`
//! and `use_power_up` validate against the clock themselves and never
//! depend on the scheduler having run.

use crossbeam_channel::{bounded, select, tick, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::engine::PowerUpEngine;
use crate::ledger::Ledger;
use crate::registry::Registry;
use powerup_core::Clock;

/// Configuration for the refresh scheduler.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time between refresh passes (ms).
    pub refresh_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5_000,
        }
    }
}

impl SchedulerConfig {
    /// Production config: a late transition costs only display lag, so
    /// tick slowly.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            refresh_interval_ms: 15_000,
        }
    }

    /// The interval as a `Duration`, never shorter than one millisecond.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

/// Background thread that drives `refresh_all`.
///
/// Dropping the scheduler stops the thread and waits for it.
pub struct RefreshScheduler {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    passes: Arc<AtomicU64>,
}

impl RefreshScheduler {
    /// Starts refreshing `engine` every `config.interval()`.
    pub fn spawn<C, K, L, R>(engine: Arc<PowerUpEngine<C, K, L, R>>, config: &SchedulerConfig) -> Self
    where
        C: Catalog + 'static,
        K: Clock + 'static,
        L: Ledger + 'static,
        R: Registry + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let passes = Arc::new(AtomicU64::new(0));
        let interval = config.interval();

        let thread_passes = Arc::clone(&passes);
        let handle = thread::spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let now = engine.clock().now();
                        let changed = engine.refresh_all(now);
                        thread_passes.fetch_add(1, Ordering::Relaxed);
                        if changed > 0 {
                            debug!(changed, %now, "refresh pass settled timers");
                        }
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            }
        });

        info!(interval_ms = config.refresh_interval_ms, "refresh scheduler started");
        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            passes,
        }
    }

    /// Completed refresh passes.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Stops the thread and waits for the current pass to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            info!(passes = self.passes(), "refresh scheduler stopped");
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_floor() {
        let config = SchedulerConfig {
            refresh_interval_ms: 0,
        };
        assert_eq!(config.interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_production_is_slower_than_default() {
        assert!(SchedulerConfig::production().interval() > SchedulerConfig::default().interval());
    }
}

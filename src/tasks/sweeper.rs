//! Expiration Sweeper Task
//!
//! Background task that periodically removes stale cache entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{CacheError, Result};

/// Something the sweeper can run a pass over.
pub(crate) trait Sweep: Send + Sync + 'static {
    /// Removes stale entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

// == Sweeper ==
/// Handle to a running sweeper task.
///
/// The task only holds a weak reference to its target and exits once the
/// target is gone. Dropping the handle aborts the task.
#[derive(Debug)]
pub(crate) struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns a sweeper on the current tokio runtime.
    ///
    /// The first pass runs one `interval` after spawning, then every
    /// `interval` after that.
    pub fn spawn<T: Sweep>(target: Weak<T>, interval: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let handle = runtime.spawn(run(target, interval));
        Ok(Self { handle })
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<T: Sweep>(target: Weak<T>, interval: Duration) {
    info!(
        "Starting expiration sweeper with interval of {} ms",
        interval.as_millis()
    );

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(target) = target.upgrade() else {
            debug!("Cache dropped, stopping expiration sweeper");
            break;
        };
        // Runs expiration callbacks inline on this worker
        let removed = target.sweep();
        drop(target);

        if removed > 0 {
            info!("Expiration sweep: removed {} stale entries", removed);
        } else {
            debug!("Expiration sweep: no stale entries found");
        }
    }
}

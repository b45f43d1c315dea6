//! Generic daemon loop driver.
//!
//! A daemon is a process-lifetime background unit: it bootstraps once, then
//! alternates iterate/sleep cycles until it is told to stop. The
//! [`TimerServiceExecutor`](crate::timers::TimerServiceExecutor) specializes
//! this loop; the driver itself knows nothing about timers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info};

use atrium_core::{Result, ResultExt};

/// A daemon's lifecycle, driven by [`DaemonDriver`].
///
/// `iterate` is invoked once per loop tick and may block up to `timeout`;
/// the default implementation just performs the base tick behavior of
/// sleeping for the timeout. `sleep` must never be called while a lock on
/// shared state is held.
#[async_trait]
pub trait DaemonLoop: Send + Sync {
    /// Invoked once before the loop starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot set up its execution context;
    /// the driver refuses to enter the loop in that case.
    async fn bootstrap(&self) -> Result<()>;

    /// Invoked on every iteration of the daemon loop.
    async fn iterate(&self, timeout: Duration) {
        self.sleep(timeout).await;
    }

    /// Suspend the daemon on a timed wait.
    async fn sleep(&self, timeout: Duration) {
        tokio::time::sleep(timeout).await;
    }
}

/// Drives a [`DaemonLoop`] for the lifetime of the owning process.
pub struct DaemonDriver<D> {
    daemon: Arc<D>,
    tick_timeout: Duration,
    running: Arc<RwLock<bool>>,
}

impl<D: DaemonLoop + 'static> DaemonDriver<D> {
    /// Create a driver that hands `tick_timeout` to every `iterate` call.
    #[must_use]
    pub fn new(daemon: Arc<D>, tick_timeout: Duration) -> Self {
        Self {
            daemon,
            tick_timeout,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// The daemon being driven.
    #[must_use]
    pub fn daemon(&self) -> &Arc<D> {
        &self.daemon
    }

    /// Bootstrap once, then loop `iterate` until [`stop`](Self::stop).
    ///
    /// Calling `start` on a driver that is already running returns
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns the bootstrap error if the daemon fails to come up; the loop
    /// is never entered in that case.
    pub async fn start(&self) -> Result<()> {
        {
            let mut running = self.running.write().await;
            if *running {
                return Ok(());
            }
            *running = true;
        }

        let boot = self
            .daemon
            .bootstrap()
            .await
            .inspect_error(|e| error!(error = %e, "Daemon bootstrap failed"));
        if let Err(e) = boot {
            let mut running = self.running.write().await;
            *running = false;
            return Err(e);
        }

        info!("Daemon loop started");

        loop {
            {
                let running = self.running.read().await;
                if !*running {
                    break;
                }
            }

            self.daemon.iterate(self.tick_timeout).await;
        }

        info!("Daemon loop stopped");
        Ok(())
    }

    /// Stop the loop after the current iteration completes.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    /// Whether the loop is currently running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

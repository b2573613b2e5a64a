//! Monitor Driver: poll the pending directory until told to stop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use super::batch::{BatchDriver, BatchSummary};

/// Create a linked shutdown trigger and listener.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle(Arc::new(tx)), ShutdownSignal(rx))
}

/// Requests a stop. Cloneable; any clone can trigger.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal(self.0.subscribe())
    }
}

/// Observes a [`ShutdownHandle`].
#[derive(Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    pub fn is_requested(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once shutdown is requested. Never resolves if every handle
    /// is dropped without triggering.
    pub async fn requested(&mut self) {
        if self.0.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Action returned by [`Monitor::sleep_or_stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    Continue,
    Stop,
}

/// Totals across every batch a monitor ran.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorReport {
    pub batches: usize,
    pub totals: BatchSummary,
}

pub struct Monitor {
    driver: Arc<BatchDriver>,
    interval: Duration,
    shutdown: ShutdownSignal,
}

impl Monitor {
    pub fn new(driver: Arc<BatchDriver>, interval: Duration, shutdown: ShutdownSignal) -> Self {
        Self {
            driver,
            interval,
            shutdown,
        }
    }

    /// Poll until shutdown.
    ///
    /// Batches run on the blocking pool. After a batch in which something
    /// succeeded the directory is checked again right away; otherwise the
    /// monitor sleeps so documents that keep failing are not retried in a
    /// tight loop.
    pub async fn run(mut self) -> MonitorReport {
        let mut report = MonitorReport::default();
        info!("Monitoring for new documents every {}s", self.interval.as_secs());

        loop {
            if self.shutdown.is_requested() {
                break;
            }

            let pending = match self.driver.has_pending() {
                Ok(pending) => pending,
                Err(e) => {
                    error!("Could not list pending documents: {}", e);
                    false
                }
            };

            if pending {
                let driver = Arc::clone(&self.driver);
                match tokio::task::spawn_blocking(move || driver.run_batch()).await {
                    Ok(Ok(summary)) => {
                        report.batches += 1;
                        report.totals.absorb(summary);
                        if summary.succeeded > 0 {
                            continue;
                        }
                    }
                    Ok(Err(e)) => error!("Batch failed: {}", e),
                    Err(e) => error!("Batch task aborted: {}", e),
                }
            }

            if self.sleep_or_stop().await == MonitorAction::Stop {
                break;
            }
        }

        info!(
            "Monitor stopped after {} batches: seen={} succeeded={} failed={}",
            report.batches, report.totals.seen, report.totals.succeeded, report.totals.failed
        );
        report
    }

    /// Sleep for the poll interval, waking early on shutdown.
    pub async fn sleep_or_stop(&mut self) -> MonitorAction {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => MonitorAction::Continue,
            _ = self.shutdown.requested() => MonitorAction::Stop,
        }
    }
}

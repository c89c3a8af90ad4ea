//! Periodic reconciliation of stranded state.
//!
//! Two kinds of debris accumulate during normal operation: reservations
//! whose settlement never ran (process died between reserve and
//! commit/refund) and purchase credits that failed after the record was
//! written. This worker sweeps both on a fixed interval.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use renolens_billing::PurchaseRecorder;
use renolens_ledger::LedgerService;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconciliationConfig {
    /// How long a reservation may sit in `Held` before it is presumed
    /// abandoned and refunded.
    pub stale_after: chrono::Duration,
    /// Pause between sweep passes.
    pub interval: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            stale_after: chrono::Duration::minutes(10),
            interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct ReconciliationWorker;

impl ReconciliationWorker {
    /// Spawn the sweep thread. Each pass refunds stale reservations and
    /// retries parked purchase credits; both operations are idempotent, so
    /// overlapping with live settlement is safe.
    ///
    /// Errors if the OS refuses the thread; callers decide whether to run
    /// without the sweep.
    pub fn spawn(
        ledger: Arc<LedgerService>,
        recorder: Arc<PurchaseRecorder>,
        config: ReconciliationConfig,
    ) -> std::io::Result<WorkerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("reconciliation".to_string())
            .spawn(move || worker_loop(&ledger, &recorder, config, &shutdown_rx))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(
    ledger: &LedgerService,
    recorder: &PurchaseRecorder,
    config: ReconciliationConfig,
    shutdown_rx: &mpsc::Receiver<()>,
) {
    loop {
        match shutdown_rx.recv_timeout(config.interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        match ledger.sweep_stale(config.stale_after) {
            Ok(refunded) if !refunded.is_empty() => {
                info!(count = refunded.len(), "refunded stale reservations");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "stale reservation sweep failed"),
        }

        let credited = recorder.reconcile();
        if credited > 0 {
            info!(credited, "reconciled parked purchase credits");
        }
    }
}

#[cfg(test)]
mod tests {
    use renolens_billing::{InMemoryPurchaseFeed, InMemoryPurchaseStore};
    use renolens_core::AccountId;
    use renolens_ledger::InMemoryAccountStore;

    use super::*;

    #[test]
    fn shutdown_joins_cleanly() {
        let ledger = Arc::new(LedgerService::new(Arc::new(InMemoryAccountStore::new())));
        let recorder = Arc::new(PurchaseRecorder::new(
            Arc::new(InMemoryPurchaseStore::new()),
            Arc::new(InMemoryPurchaseFeed::new()),
            Arc::clone(&ledger),
        ));

        let handle = ReconciliationWorker::spawn(
            ledger,
            recorder,
            ReconciliationConfig {
                stale_after: chrono::Duration::minutes(10),
                interval: Duration::from_millis(10),
            },
        )
        .unwrap();
        handle.shutdown();
    }

    #[test]
    fn sweep_refunds_abandoned_reservations() {
        let ledger = Arc::new(LedgerService::new(Arc::new(InMemoryAccountStore::new())));
        let recorder = Arc::new(PurchaseRecorder::new(
            Arc::new(InMemoryPurchaseStore::new()),
            Arc::new(InMemoryPurchaseFeed::new()),
            Arc::clone(&ledger),
        ));

        let account = AccountId::new();
        let _abandoned = ledger.reserve(account, 30).unwrap();
        assert_eq!(ledger.balance_of(account).unwrap(), 70);

        let handle = ReconciliationWorker::spawn(
            Arc::clone(&ledger),
            recorder,
            ReconciliationConfig {
                // Everything is immediately stale.
                stale_after: chrono::Duration::zero(),
                interval: Duration::from_millis(5),
            },
        )
        .unwrap();

        // Give the worker a couple of ticks.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while ledger.balance_of(account).unwrap() != 100 {
            assert!(std::time::Instant::now() < deadline, "sweep never refunded");
            thread::sleep(Duration::from_millis(5));
        }

        handle.shutdown();
        assert_eq!(ledger.balance_of(account).unwrap(), 100);
    }
}

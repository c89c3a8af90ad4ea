//! Service wiring: stores, ledger, recorder, revenue, executor, worker.
//!
//! Default wiring is fully in-memory (dev/test). With the `postgres` feature
//! and `DATABASE_URL` set, account balances and the purchase trail persist;
//! the reservation registry and feed remain in-process either way.

use std::sync::Arc;

use renolens_auth::IdentityVerifier;
use renolens_billing::{
    InMemoryPurchaseFeed, InMemoryPurchaseStore, PurchaseFeed, PurchaseRecorder, PurchaseStore,
};
use renolens_generation::{ExecutorConfig, GenerationExecutor, ImageModel};
use renolens_infra::{CannedImageModel, ReconciliationConfig, ReconciliationWorker, WorkerHandle};
use renolens_ledger::{AccountStore, InMemoryAccountStore, LedgerService};
use renolens_revenue::RevenueService;

pub struct AppServices {
    pub accounts: Arc<dyn AccountStore>,
    pub ledger: Arc<LedgerService>,
    pub recorder: Arc<PurchaseRecorder>,
    pub revenue: Arc<RevenueService>,
    pub executor: Arc<GenerationExecutor>,
    pub purchases: Arc<dyn PurchaseStore>,
    worker: Option<WorkerHandle>,
}

impl AppServices {
    /// Stop the reconciliation worker and wait for it to finish its pass.
    pub fn shutdown(mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

pub fn build_services(verifier: Arc<dyn IdentityVerifier>) -> AppServices {
    let (accounts, purchases) = build_stores();
    let feed: Arc<dyn PurchaseFeed> = Arc::new(InMemoryPurchaseFeed::new());
    let model: Arc<dyn ImageModel> = Arc::new(CannedImageModel::new());

    let ledger = Arc::new(LedgerService::new(Arc::clone(&accounts)));
    let recorder = Arc::new(PurchaseRecorder::new(
        Arc::clone(&purchases),
        Arc::clone(&feed),
        Arc::clone(&ledger),
    ));
    let revenue = Arc::new(RevenueService::new(Arc::clone(&purchases), feed));
    let executor = Arc::new(GenerationExecutor::new(
        verifier,
        Arc::clone(&ledger),
        model,
        ExecutorConfig::default(),
    ));

    let worker = match ReconciliationWorker::spawn(
        Arc::clone(&ledger),
        Arc::clone(&recorder),
        ReconciliationConfig::default(),
    ) {
        Ok(worker) => Some(worker),
        Err(e) => {
            // Degrade: stale reservations and parked credits go unswept
            // until restart.
            tracing::error!(error = %e, "reconciliation worker failed to start");
            None
        }
    };

    AppServices {
        accounts,
        ledger,
        recorder,
        revenue,
        executor,
        purchases,
        worker,
    }
}

fn in_memory_stores() -> (Arc<dyn AccountStore>, Arc<dyn PurchaseStore>) {
    (
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryPurchaseStore::new()),
    )
}

#[cfg(not(feature = "postgres"))]
fn build_stores() -> (Arc<dyn AccountStore>, Arc<dyn PurchaseStore>) {
    in_memory_stores()
}

#[cfg(feature = "postgres")]
fn build_stores() -> (Arc<dyn AccountStore>, Arc<dyn PurchaseStore>) {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores");
        return in_memory_stores();
    };

    match sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect_lazy(&url)
    {
        Ok(pool) => (
            Arc::new(renolens_infra::PostgresAccountStore::new(pool.clone())),
            Arc::new(renolens_infra::PostgresPurchaseStore::new(pool)),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "invalid DATABASE_URL; using in-memory stores");
            in_memory_stores()
        }
    }
}

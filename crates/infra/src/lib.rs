//! `renolens-infra` — adapters and background machinery.
//!
//! Postgres-backed stores (behind the `postgres` feature), the periodic
//! reconciliation worker, and a canned image model for dev deployments
//! without a paid provider.

pub mod model;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod workers;

pub use model::CannedImageModel;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresAccountStore, PostgresPurchaseStore};
pub use workers::{ReconciliationConfig, ReconciliationWorker, WorkerHandle};

//! Purchase record storage boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

use renolens_core::PurchaseId;

use crate::purchase::PurchaseRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PurchaseStoreError {
    #[error("purchase store unavailable: {0}")]
    Unavailable(String),

    /// Append-only: a purchase id can be written at most once.
    #[error("duplicate purchase id: {0}")]
    Duplicate(PurchaseId),
}

/// Append-only store of purchase records, ordered by write commit.
///
/// Records are never updated or deleted; windowed reads see every record
/// committed before the read started.
pub trait PurchaseStore: Send + Sync {
    fn append(&self, record: &PurchaseRecord) -> Result<(), PurchaseStoreError>;

    /// Records with `created_at` in `[start, end)`, in commit order.
    fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PurchaseRecord>, PurchaseStoreError>;

    /// Most recent records, newest first (admin history view).
    fn list_recent(&self, limit: usize) -> Result<Vec<PurchaseRecord>, PurchaseStoreError>;
}

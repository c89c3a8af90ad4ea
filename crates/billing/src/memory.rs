//! In-memory purchase store for tests/dev.

use std::collections::HashSet;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use renolens_core::PurchaseId;

use crate::purchase::PurchaseRecord;
use crate::store::{PurchaseStore, PurchaseStoreError};

/// Append-only vector of records; commit order is insertion order.
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseStore {
    records: RwLock<(Vec<PurchaseRecord>, HashSet<PurchaseId>)>,
}

impl InMemoryPurchaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PurchaseStore for InMemoryPurchaseStore {
    fn append(&self, record: &PurchaseRecord) -> Result<(), PurchaseStoreError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| PurchaseStoreError::Unavailable("lock poisoned".to_string()))?;

        let (records, ids) = &mut *guard;
        if !ids.insert(record.purchase_id) {
            return Err(PurchaseStoreError::Duplicate(record.purchase_id));
        }
        records.push(record.clone());
        Ok(())
    }

    fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PurchaseRecord>, PurchaseStoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| PurchaseStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(guard
            .0
            .iter()
            .filter(|r| r.created_at >= start && r.created_at < end)
            .cloned()
            .collect())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<PurchaseRecord>, PurchaseStoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| PurchaseStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(guard.0.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use renolens_core::AccountId;

    use super::*;

    fn record() -> PurchaseRecord {
        PurchaseRecord::new(AccountId::new(), "Starter Pack", 100, 0, 499, "USD").unwrap()
    }

    #[test]
    fn duplicate_append_is_rejected() {
        let store = InMemoryPurchaseStore::new();
        let r = record();
        store.append(&r).unwrap();
        assert_eq!(
            store.append(&r).unwrap_err(),
            PurchaseStoreError::Duplicate(r.purchase_id)
        );
    }

    #[test]
    fn window_is_half_open() {
        let store = InMemoryPurchaseStore::new();
        let r = record();
        store.append(&r).unwrap();

        let hits = store.list_between(r.created_at, r.created_at + chrono::Duration::seconds(1));
        assert_eq!(hits.unwrap().len(), 1);

        // End bound is exclusive.
        let misses = store.list_between(r.created_at - chrono::Duration::seconds(1), r.created_at);
        assert!(misses.unwrap().is_empty());
    }

    #[test]
    fn recent_is_newest_first() {
        let store = InMemoryPurchaseStore::new();
        let a = record();
        let b = record();
        store.append(&a).unwrap();
        store.append(&b).unwrap();

        let recent = store.list_recent(1).unwrap();
        assert_eq!(recent, vec![b]);
    }
}

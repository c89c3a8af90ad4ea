//! Purchase recording: audit record, live feed, ledger credit.
//!
//! Ordering is deliberate: the record is appended first (authoritative),
//! then published to the feed, then the ledger is credited. A credit that
//! fails after the append leaves the system observably inconsistent; the
//! failed credit is parked and retried by [`PurchaseRecorder::reconcile`]
//! up to [`MAX_CREDIT_ATTEMPTS`] times before being abandoned with the
//! record left as the audit trail.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{error, info, warn};

use renolens_core::{AccountId, DomainError, PurchaseId};
use renolens_ledger::{LedgerError, LedgerService};

use crate::catalog::TokenPackage;
use crate::feed::PurchaseFeed;
use crate::purchase::{DEFAULT_CURRENCY, PurchaseRecord};
use crate::store::{PurchaseStore, PurchaseStoreError};

/// Reconciliation gives up on a parked credit after this many failures.
pub const MAX_CREDIT_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("invalid purchase: {0}")]
    Invalid(#[from] DomainError),

    /// Nothing was recorded; safe to retry the whole purchase.
    #[error("purchase write failed: {0}")]
    WriteFailed(#[from] PurchaseStoreError),

    /// The record exists but the account was not credited.
    #[error("purchase {purchase_id} recorded but credit failed: {source}")]
    CreditInconsistency {
        purchase_id: PurchaseId,
        #[source]
        source: LedgerError,
    },
}

#[derive(Debug, Clone)]
struct PendingCredit {
    purchase_id: PurchaseId,
    account_id: AccountId,
    amount: i64,
    attempts: u32,
}

/// A recorded purchase and the balance its credit produced.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub record: PurchaseRecord,
    pub balance: i64,
}

/// Records completed purchases and credits the buyer's token balance.
pub struct PurchaseRecorder {
    store: Arc<dyn PurchaseStore>,
    feed: Arc<dyn PurchaseFeed>,
    ledger: Arc<LedgerService>,
    unreconciled: Mutex<Vec<PendingCredit>>,
    // Serializes append+publish so feed order always matches commit order.
    commit_order: Mutex<()>,
}

impl PurchaseRecorder {
    pub fn new(
        store: Arc<dyn PurchaseStore>,
        feed: Arc<dyn PurchaseFeed>,
        ledger: Arc<LedgerService>,
    ) -> Self {
        Self {
            store,
            feed,
            ledger,
            unreconciled: Mutex::new(Vec::new()),
            commit_order: Mutex::new(()),
        }
    }

    /// Record one completed purchase and credit `base + bonus` tokens.
    ///
    /// On [`PurchaseError::CreditInconsistency`] the record has been written
    /// and published but the balance is stale until reconciliation succeeds.
    pub fn record_purchase(
        &self,
        account_id: AccountId,
        package_name: &str,
        base_tokens: i64,
        bonus_tokens: i64,
        price_cents: i64,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let record = PurchaseRecord::new(
            account_id,
            package_name,
            base_tokens,
            bonus_tokens,
            price_cents,
            DEFAULT_CURRENCY,
        )?;

        {
            // A record appended between another record's append and publish
            // would reach subscribers out of commit order.
            let _order = self
                .commit_order
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            self.store.append(&record)?;

            if let Err(e) = self.feed.publish(&record) {
                // The store append is authoritative; live views catch up on
                // reload.
                warn!(purchase_id = %record.purchase_id, error = %e, "purchase feed publish failed");
            }
        }

        match self.ledger.credit(account_id, record.total_tokens) {
            Ok(balance) => {
                info!(
                    purchase_id = %record.purchase_id,
                    account_id = %account_id,
                    tokens = record.total_tokens,
                    balance,
                    "purchase recorded"
                );
                Ok(PurchaseReceipt { record, balance })
            }
            Err(source) => {
                error!(
                    purchase_id = %record.purchase_id,
                    account_id = %account_id,
                    tokens = record.total_tokens,
                    error = %source,
                    "purchase recorded but credit failed"
                );
                self.park(PendingCredit {
                    purchase_id: record.purchase_id,
                    account_id,
                    amount: record.total_tokens,
                    attempts: 1,
                });
                Err(PurchaseError::CreditInconsistency {
                    purchase_id: record.purchase_id,
                    source,
                })
            }
        }
    }

    /// Record a purchase of a catalog package at its listed price.
    pub fn buy_package(
        &self,
        account_id: AccountId,
        package: &TokenPackage,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        self.record_purchase(
            account_id,
            package.name,
            package.base_tokens,
            package.bonus_tokens,
            package.price_cents,
        )
    }

    /// Retry parked credits once each. Returns the number credited; credits
    /// that have failed [`MAX_CREDIT_ATTEMPTS`] times are dropped from the
    /// retry queue (the purchase record remains).
    pub fn reconcile(&self) -> usize {
        let pending = match self.unreconciled.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return 0,
        };

        let mut credited = 0;
        let mut still_pending = Vec::new();

        for mut credit in pending {
            match self.ledger.credit(credit.account_id, credit.amount) {
                Ok(balance) => {
                    info!(
                        purchase_id = %credit.purchase_id,
                        account_id = %credit.account_id,
                        balance,
                        "reconciled parked purchase credit"
                    );
                    credited += 1;
                }
                Err(e) => {
                    credit.attempts += 1;
                    if credit.attempts >= MAX_CREDIT_ATTEMPTS {
                        error!(
                            purchase_id = %credit.purchase_id,
                            account_id = %credit.account_id,
                            attempts = credit.attempts,
                            error = %e,
                            "giving up on parked purchase credit"
                        );
                    } else {
                        warn!(
                            purchase_id = %credit.purchase_id,
                            attempts = credit.attempts,
                            error = %e,
                            "parked purchase credit still failing"
                        );
                        still_pending.push(credit);
                    }
                }
            }
        }

        if !still_pending.is_empty() {
            self.park_all(still_pending);
        }
        credited
    }

    /// Credits recorded but not yet applied to a balance.
    pub fn unreconciled_count(&self) -> usize {
        self.unreconciled.lock().map(|g| g.len()).unwrap_or(0)
    }

    fn park(&self, credit: PendingCredit) {
        self.park_all(vec![credit]);
    }

    fn park_all(&self, credits: Vec<PendingCredit>) {
        if let Ok(mut guard) = self.unreconciled.lock() {
            guard.extend(credits);
        }
    }
}

#[cfg(test)]
mod tests {
    use renolens_ledger::{
        AccountStore, DebitOutcome, InMemoryAccountStore, StoreError,
    };

    use crate::feed::InMemoryPurchaseFeed;
    use crate::memory::InMemoryPurchaseStore;

    use super::*;

    fn recorder_with_balance(balance: i64) -> (PurchaseRecorder, AccountId, Arc<LedgerService>) {
        let accounts = Arc::new(InMemoryAccountStore::with_starting_balance(balance));
        let ledger = Arc::new(LedgerService::new(accounts));
        let recorder = PurchaseRecorder::new(
            Arc::new(InMemoryPurchaseStore::new()),
            Arc::new(InMemoryPurchaseFeed::new()),
            Arc::clone(&ledger),
        );
        (recorder, AccountId::new(), ledger)
    }

    #[test]
    fn purchase_credits_base_plus_bonus() {
        let (recorder, account, ledger) = recorder_with_balance(0);

        let receipt = recorder
            .record_purchase(account, "Pro Pack", 300, 50, 1299)
            .unwrap();

        assert_eq!(receipt.record.total_tokens, 350);
        // The receipt balance is the credit's result, not a re-read.
        assert_eq!(receipt.balance, 350);
        assert_eq!(ledger.balance_of(account).unwrap(), 350);
    }

    #[test]
    fn buy_package_uses_catalog_price() {
        let (recorder, account, ledger) = recorder_with_balance(0);
        let premium = crate::catalog::package_by_id("premium").unwrap();

        let receipt = recorder.buy_package(account, premium).unwrap();

        assert_eq!(receipt.record.price_cents, 3999);
        assert_eq!(receipt.balance, 1200);
        assert_eq!(ledger.balance_of(account).unwrap(), 1200);
    }

    #[test]
    fn invalid_purchase_writes_nothing() {
        let accounts = Arc::new(InMemoryAccountStore::with_starting_balance(0));
        let ledger = Arc::new(LedgerService::new(accounts));
        let store = Arc::new(InMemoryPurchaseStore::new());
        let recorder = PurchaseRecorder::new(
            Arc::clone(&store) as Arc<dyn PurchaseStore>,
            Arc::new(InMemoryPurchaseFeed::new()),
            Arc::clone(&ledger),
        );
        let account = AccountId::new();

        let err = recorder.record_purchase(account, "Free Pack", 100, 0, 0);
        assert!(matches!(err, Err(PurchaseError::Invalid(_))));
        assert!(store.list_recent(10).unwrap().is_empty());
        assert_eq!(ledger.balance_of(account).unwrap(), 0);
    }

    #[test]
    fn purchase_publishes_to_feed() {
        let accounts = Arc::new(InMemoryAccountStore::with_starting_balance(0));
        let ledger = Arc::new(LedgerService::new(accounts));
        let feed = Arc::new(InMemoryPurchaseFeed::new());
        let recorder = PurchaseRecorder::new(
            Arc::new(InMemoryPurchaseStore::new()),
            Arc::clone(&feed) as Arc<dyn PurchaseFeed>,
            ledger,
        );

        let sub = feed.subscribe().unwrap();
        let receipt = recorder
            .record_purchase(AccountId::new(), "Starter Pack", 100, 0, 499)
            .unwrap();

        assert_eq!(sub.try_recv().unwrap().purchase_id, receipt.record.purchase_id);
    }

    #[test]
    fn feed_order_matches_commit_order_under_contention() {
        let accounts = Arc::new(InMemoryAccountStore::with_starting_balance(0));
        let ledger = Arc::new(LedgerService::new(accounts));
        let store = Arc::new(InMemoryPurchaseStore::new());
        let feed = Arc::new(InMemoryPurchaseFeed::new());
        let recorder = Arc::new(PurchaseRecorder::new(
            Arc::clone(&store) as Arc<dyn PurchaseStore>,
            Arc::clone(&feed) as Arc<dyn PurchaseFeed>,
            ledger,
        ));

        let sub = feed.subscribe().unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let recorder = Arc::clone(&recorder);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    recorder
                        .record_purchase(AccountId::new(), "Starter Pack", 100, 0, 499)
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut committed: Vec<PurchaseId> = store
            .list_recent(200)
            .unwrap()
            .into_iter()
            .map(|r| r.purchase_id)
            .collect();
        committed.reverse(); // list_recent is newest first

        let mut delivered = Vec::new();
        while let Some(record) = sub.try_recv() {
            delivered.push(record.purchase_id);
        }

        assert_eq!(delivered.len(), 200);
        assert_eq!(delivered, committed);
    }

    /// Account store that fails every write until `recover` is called.
    struct FlakyAccountStore {
        inner: InMemoryAccountStore,
        failing: std::sync::atomic::AtomicBool,
    }

    impl FlakyAccountStore {
        fn failing() -> Self {
            Self {
                inner: InMemoryAccountStore::with_starting_balance(0),
                failing: std::sync::atomic::AtomicBool::new(true),
            }
        }

        fn recover(&self) {
            self.failing
                .store(false, std::sync::atomic::Ordering::SeqCst);
        }

        fn is_failing(&self) -> bool {
            self.failing.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    impl AccountStore for FlakyAccountStore {
        fn try_debit(&self, account_id: AccountId, amount: i64) -> Result<DebitOutcome, StoreError> {
            if self.is_failing() {
                return Err(StoreError::Unavailable("store offline".to_string()));
            }
            self.inner.try_debit(account_id, amount)
        }

        fn credit(&self, account_id: AccountId, amount: i64) -> Result<i64, StoreError> {
            if self.is_failing() {
                return Err(StoreError::Unavailable("store offline".to_string()));
            }
            self.inner.credit(account_id, amount)
        }

        fn balance_of(&self, account_id: AccountId) -> Result<i64, StoreError> {
            self.inner.balance_of(account_id)
        }

        fn list_accounts(&self) -> Result<Vec<renolens_ledger::Account>, StoreError> {
            self.inner.list_accounts()
        }
    }

    #[test]
    fn failed_credit_keeps_record_and_reconciles_later() {
        let accounts = Arc::new(FlakyAccountStore::failing());
        let ledger = Arc::new(LedgerService::new(
            Arc::clone(&accounts) as Arc<dyn AccountStore>
        ));
        let store = Arc::new(InMemoryPurchaseStore::new());
        let recorder = PurchaseRecorder::new(
            Arc::clone(&store) as Arc<dyn PurchaseStore>,
            Arc::new(InMemoryPurchaseFeed::new()),
            Arc::clone(&ledger),
        );
        let account = AccountId::new();

        let err = recorder.record_purchase(account, "Pro Pack", 300, 50, 1299);
        assert!(matches!(
            err,
            Err(PurchaseError::CreditInconsistency { .. })
        ));
        // Audit record survives the failed credit.
        assert_eq!(store.list_recent(10).unwrap().len(), 1);
        assert_eq!(recorder.unreconciled_count(), 1);

        // Store still down: reconcile applies nothing.
        assert_eq!(recorder.reconcile(), 0);
        assert_eq!(recorder.unreconciled_count(), 1);

        accounts.recover();
        assert_eq!(recorder.reconcile(), 1);
        assert_eq!(recorder.unreconciled_count(), 0);
        assert_eq!(ledger.balance_of(account).unwrap(), 350);

        // Reconcile is idempotent once the queue is drained.
        assert_eq!(recorder.reconcile(), 0);
        assert_eq!(ledger.balance_of(account).unwrap(), 350);
    }

    #[test]
    fn parked_credit_is_abandoned_after_max_attempts() {
        let accounts = Arc::new(FlakyAccountStore::failing());
        let ledger = Arc::new(LedgerService::new(
            Arc::clone(&accounts) as Arc<dyn AccountStore>
        ));
        let recorder = PurchaseRecorder::new(
            Arc::new(InMemoryPurchaseStore::new()),
            Arc::new(InMemoryPurchaseFeed::new()),
            ledger,
        );

        let _ = recorder.record_purchase(AccountId::new(), "Starter Pack", 100, 0, 499);
        assert_eq!(recorder.unreconciled_count(), 1);

        for _ in 0..MAX_CREDIT_ATTEMPTS {
            recorder.reconcile();
        }
        assert_eq!(recorder.unreconciled_count(), 0);
    }
}

//! In-memory account store for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use renolens_core::AccountId;

use crate::account::{Account, DEFAULT_STARTING_BALANCE};
use crate::store::{AccountStore, DebitOutcome, StoreError};

/// In-memory balance map.
///
/// A single lock serializes every mutation, which over-satisfies the
/// per-account atomicity the ledger needs. Intended for tests/dev; the
/// Postgres store provides row-level atomicity without cross-account
/// serialization.
#[derive(Debug)]
pub struct InMemoryAccountStore {
    balances: RwLock<HashMap<AccountId, i64>>,
    starting_balance: i64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            starting_balance: DEFAULT_STARTING_BALANCE,
        }
    }

    /// Override the lazily-granted starting balance (tests).
    pub fn with_starting_balance(starting_balance: i64) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            starting_balance,
        }
    }

    /// Force a balance, creating the account if needed (tests/fixtures).
    pub fn seed(&self, account_id: AccountId, balance: i64) {
        if let Ok(mut balances) = self.balances.write() {
            balances.insert(account_id, balance);
        }
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn try_debit(&self, account_id: AccountId, amount: i64) -> Result<DebitOutcome, StoreError> {
        let mut balances = self
            .balances
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let balance = balances.entry(account_id).or_insert(self.starting_balance);
        if *balance >= amount {
            *balance -= amount;
            Ok(DebitOutcome::Debited { remaining: *balance })
        } else {
            Ok(DebitOutcome::Insufficient { have: *balance })
        }
    }

    fn credit(&self, account_id: AccountId, amount: i64) -> Result<i64, StoreError> {
        let mut balances = self
            .balances
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let balance = balances.entry(account_id).or_insert(self.starting_balance);
        *balance += amount;
        Ok(*balance)
    }

    fn balance_of(&self, account_id: AccountId) -> Result<i64, StoreError> {
        // Get-or-create needs the write lock even for a read.
        let mut balances = self
            .balances
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(*balances.entry(account_id).or_insert(self.starting_balance))
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let balances = self
            .balances
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let mut accounts: Vec<Account> = balances
            .iter()
            .map(|(account_id, balance)| Account {
                account_id: *account_id,
                balance: *balance,
            })
            .collect();
        accounts.sort_by_key(|a| *a.account_id.as_uuid());
        Ok(accounts)
    }
}

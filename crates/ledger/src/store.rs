//! Account storage boundary.
//!
//! Implementations must make `try_debit` atomic with respect to all other
//! mutations on the same account: the check and the decrement are one
//! operation (e.g. a conditional row update), never a read followed by a
//! write. Operations on different accounts should not serialize against each
//! other where the backend allows it.

use thiserror::Error;

use renolens_core::AccountId;

use crate::account::Account;

/// Storage-level failure. The ledger fails closed on these: a failed debit is
/// never treated as a successful reservation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the write.
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of an atomic conditional debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Balance was sufficient; the decrement has been applied.
    Debited { remaining: i64 },
    /// Balance was insufficient; nothing was mutated.
    Insufficient { have: i64 },
}

/// Persistent mapping from account identity to token balance.
///
/// Every operation creates the account at [`DEFAULT_STARTING_BALANCE`] if it
/// has not been seen before (single atomic get-or-create, no
/// insert-then-fallback-read race).
///
/// [`DEFAULT_STARTING_BALANCE`]: crate::account::DEFAULT_STARTING_BALANCE
pub trait AccountStore: Send + Sync {
    /// Atomically decrement `amount` if `balance >= amount`.
    fn try_debit(&self, account_id: AccountId, amount: i64) -> Result<DebitOutcome, StoreError>;

    /// Atomically add `amount`, returning the new balance.
    fn credit(&self, account_id: AccountId, amount: i64) -> Result<i64, StoreError>;

    /// Current balance (creates the account at the default balance if absent).
    fn balance_of(&self, account_id: AccountId) -> Result<i64, StoreError>;

    /// Snapshot of all known accounts (admin read surface).
    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;
}

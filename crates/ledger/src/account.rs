use serde::{Deserialize, Serialize};

use renolens_core::AccountId;

/// Balance granted to an account the first time the ledger sees it.
pub const DEFAULT_STARTING_BALANCE: i64 = 100;

/// Read-only snapshot of a token account.
///
/// Accounts are created lazily on first ledger access and never deleted by
/// this component; deletion is an external account-lifecycle concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    /// Token balance. Non-negative at all observable times.
    pub balance: i64,
}

//! Ledger operations: reserve, commit, refund, credit.
//!
//! A reservation is a *provisional, already-applied* decrement: `reserve`
//! debits the balance up front, and the paid operation's outcome decides
//! whether the decrement sticks (`commit`) or is reversed (`refund`). No lock
//! is held while the paid call runs; the durable fact is the decremented
//! balance itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use renolens_core::{AccountId, ReservationId};

use crate::store::{AccountStore, DebitOutcome, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Balance check failed; nothing was mutated.
    #[error("insufficient balance: need {needed} tokens, have {have}")]
    InsufficientBalance { needed: i64, have: i64 },

    /// Reserve/credit amounts must be strictly positive.
    #[error("invalid amount: {0} (must be > 0)")]
    InvalidAmount(i64),

    /// The token does not belong to this ledger instance.
    #[error("unknown reservation: {0}")]
    UnknownReservation(ReservationId),

    /// The account store is unavailable. Fail closed: a failed reserve is
    /// never a success.
    #[error("ledger write failed: {0}")]
    Store(#[from] StoreError),
}

/// Lifecycle of a reservation. `Committed` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    Held,
    Committed,
    Refunded,
}

/// Proof of a successful `reserve`, required for `commit`/`refund`.
#[derive(Debug, Clone)]
pub struct ReservationToken {
    reservation_id: ReservationId,
    account_id: AccountId,
    cost: i64,
    balance_after: i64,
}

impl ReservationToken {
    pub fn reservation_id(&self) -> ReservationId {
        self.reservation_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// Balance observed immediately after the reservation's decrement.
    pub fn balance_after(&self) -> i64 {
        self.balance_after
    }
}

#[derive(Debug, Clone, Copy)]
struct ReservationEntry {
    account_id: AccountId,
    cost: i64,
    state: ReservationState,
    reserved_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

/// The only component that mutates account balances.
///
/// Atomicity of the balance check-and-decrement lives in the store; this
/// service adds the reservation lifecycle (idempotent commit/refund) and the
/// stale-reservation sweep.
pub struct LedgerService {
    store: Arc<dyn AccountStore>,
    reservations: Mutex<HashMap<ReservationId, ReservationEntry>>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            reservations: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically check `balance >= cost` and decrement.
    ///
    /// Two concurrent reserves racing over one job's worth of balance resolve
    /// to exactly one success; the loser sees `InsufficientBalance` and no
    /// mutation.
    pub fn reserve(&self, account_id: AccountId, cost: i64) -> Result<ReservationToken, LedgerError> {
        if cost <= 0 {
            return Err(LedgerError::InvalidAmount(cost));
        }

        match self.store.try_debit(account_id, cost)? {
            DebitOutcome::Debited { remaining } => {
                let reservation_id = ReservationId::new();
                let entry = ReservationEntry {
                    account_id,
                    cost,
                    state: ReservationState::Held,
                    reserved_at: Utc::now(),
                    settled_at: None,
                };
                self.lock_reservations()?.insert(reservation_id, entry);

                tracing::debug!(%account_id, %reservation_id, cost, remaining, "tokens reserved");
                Ok(ReservationToken {
                    reservation_id,
                    account_id,
                    cost,
                    balance_after: remaining,
                })
            }
            DebitOutcome::Insufficient { have } => {
                Err(LedgerError::InsufficientBalance { needed: cost, have })
            }
        }
    }

    /// Finalize a reservation. The decrement already happened at reserve
    /// time, so this only flips state. Idempotent; a no-op on already
    /// committed or refunded tokens.
    pub fn commit(&self, token: &ReservationToken) -> Result<(), LedgerError> {
        let mut reservations = self.lock_reservations()?;
        let entry = reservations
            .get_mut(&token.reservation_id)
            .ok_or(LedgerError::UnknownReservation(token.reservation_id))?;

        if entry.state == ReservationState::Held {
            entry.state = ReservationState::Committed;
            entry.settled_at = Some(Utc::now());
            tracing::debug!(reservation_id = %token.reservation_id, "reservation committed");
        }
        Ok(())
    }

    /// Reverse a reservation's decrement. Idempotent; refunding an already
    /// committed or refunded token is a no-op, tolerating retries after
    /// partial failures.
    pub fn refund(&self, token: &ReservationToken) -> Result<(), LedgerError> {
        // Claim the refund under the lock, credit outside it. Concurrent
        // refunds of the same token credit at most once.
        {
            let mut reservations = self.lock_reservations()?;
            let entry = reservations
                .get_mut(&token.reservation_id)
                .ok_or(LedgerError::UnknownReservation(token.reservation_id))?;

            match entry.state {
                ReservationState::Held => {
                    entry.state = ReservationState::Refunded;
                    entry.settled_at = Some(Utc::now());
                }
                ReservationState::Committed | ReservationState::Refunded => return Ok(()),
            }
        }

        match self.store.credit(token.account_id, token.cost) {
            Ok(balance) => {
                tracing::debug!(
                    reservation_id = %token.reservation_id,
                    cost = token.cost,
                    balance,
                    "reservation refunded"
                );
                Ok(())
            }
            Err(e) => {
                // Put the claim back so a retry can complete the refund.
                if let Ok(mut reservations) = self.reservations.lock() {
                    if let Some(entry) = reservations.get_mut(&token.reservation_id) {
                        entry.state = ReservationState::Held;
                        entry.settled_at = None;
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Add purchased tokens to an account. Used by the purchase recorder
    /// only; amounts must be strictly positive. Returns the new balance.
    pub fn credit(&self, account_id: AccountId, amount: i64) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let balance = self.store.credit(account_id, amount)?;
        tracing::debug!(%account_id, amount, balance, "tokens credited");
        Ok(balance)
    }

    /// Read-only balance; creates the account at the default balance if
    /// absent.
    pub fn balance_of(&self, account_id: AccountId) -> Result<i64, LedgerError> {
        Ok(self.store.balance_of(account_id)?)
    }

    /// Current state of a reservation, if this instance knows it.
    pub fn reservation_state(&self, reservation_id: ReservationId) -> Option<ReservationState> {
        self.reservations
            .lock()
            .ok()
            .and_then(|r| r.get(&reservation_id).map(|e| e.state))
    }

    /// Refund reservations still `Held` after `older_than`, and drop settled
    /// entries that have aged past the same threshold.
    ///
    /// This is the reconciliation sweep for reservations abandoned by a
    /// crashed or hung executor: the account stays under-credited by `cost`
    /// until the sweep resolves it. Returns the refunded reservation ids.
    ///
    /// Settled entries are retained for `older_than` after commit/refund so
    /// late settlement retries stay idempotent; past that they fall out of
    /// the registry, which otherwise grows by one entry per job.
    pub fn sweep_stale(&self, older_than: Duration) -> Result<Vec<ReservationId>, LedgerError> {
        let cutoff = Utc::now() - older_than;

        // Claim all stale holds in one pass, then credit outside the lock.
        let claimed: Vec<(ReservationId, AccountId, i64)> = {
            let mut reservations = self.lock_reservations()?;
            reservations.retain(|_, e| {
                e.state == ReservationState::Held
                    || e.settled_at.map_or(true, |settled| settled > cutoff)
            });
            reservations
                .iter_mut()
                .filter(|(_, e)| e.state == ReservationState::Held && e.reserved_at <= cutoff)
                .map(|(id, e)| {
                    e.state = ReservationState::Refunded;
                    e.settled_at = Some(Utc::now());
                    (*id, e.account_id, e.cost)
                })
                .collect()
        };

        let mut refunded = Vec::with_capacity(claimed.len());
        for (reservation_id, account_id, cost) in claimed {
            match self.store.credit(account_id, cost) {
                Ok(balance) => {
                    tracing::info!(%reservation_id, %account_id, cost, balance, "stale reservation refunded");
                    refunded.push(reservation_id);
                }
                Err(e) => {
                    tracing::warn!(%reservation_id, error = %e, "stale refund failed; will retry next sweep");
                    if let Ok(mut reservations) = self.reservations.lock() {
                        if let Some(entry) = reservations.get_mut(&reservation_id) {
                            entry.state = ReservationState::Held;
                            entry.settled_at = None;
                        }
                    }
                }
            }
        }
        Ok(refunded)
    }

    fn lock_reservations(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ReservationId, ReservationEntry>>, LedgerError>
    {
        self.reservations
            .lock()
            .map_err(|_| StoreError::Unavailable("reservation registry lock poisoned".to_string()).into())
    }
}

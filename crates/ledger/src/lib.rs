//! `renolens-ledger` — the token ledger.
//!
//! The only component permitted to mutate an account's token balance. All
//! mutations go through [`LedgerService`]: atomic reserve, idempotent
//! commit/refund, and purchase credits. The balance check-and-decrement is
//! pushed down into the [`AccountStore`] so it can be a single conditional
//! row update in persistent deployments.

pub mod account;
pub mod memory;
pub mod service;
pub mod store;

pub use account::{Account, DEFAULT_STARTING_BALANCE};
pub use memory::InMemoryAccountStore;
pub use service::{LedgerError, LedgerService, ReservationState, ReservationToken};
pub use store::{AccountStore, DebitOutcome, StoreError};

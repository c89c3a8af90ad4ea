//! Postgres-backed stores.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE token_accounts (
//!     account_id UUID PRIMARY KEY,
//!     balance    BIGINT NOT NULL CHECK (balance >= 0)
//! );
//!
//! CREATE TABLE purchases (
//!     purchase_id  UUID PRIMARY KEY,
//!     account_id   UUID NOT NULL,
//!     package_name TEXT NOT NULL,
//!     base_tokens  BIGINT NOT NULL,
//!     bonus_tokens BIGINT NOT NULL,
//!     total_tokens BIGINT NOT NULL,
//!     price_cents  BIGINT NOT NULL,
//!     currency     TEXT NOT NULL,
//!     status       TEXT NOT NULL,
//!     created_at   TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX purchases_created_at_idx ON purchases (created_at);
//! ```
//!
//! The store traits are synchronous; these adapters bridge onto the ambient
//! tokio runtime with `Handle::block_on`, so they must be called from
//! blocking threads (`spawn_blocking`, worker threads), never from an async
//! task directly.

mod accounts;
mod purchases;

pub use accounts::PostgresAccountStore;
pub use purchases::PostgresPurchaseStore;

use tokio::runtime::Handle;

fn runtime_handle<E>(err: impl Fn(String) -> E) -> Result<Handle, E> {
    Handle::try_current().map_err(|_| err("no tokio runtime available".to_string()))
}

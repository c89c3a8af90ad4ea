use std::sync::Arc;

use sqlx::{PgPool, Row};

use renolens_core::AccountId;
use renolens_ledger::{
    Account, AccountStore, DEFAULT_STARTING_BALANCE, DebitOutcome, StoreError,
};

use super::runtime_handle;

/// Postgres-backed account store.
///
/// The balance check-and-decrement is a single conditional `UPDATE`, so
/// atomicity holds across processes, not just within one.
pub struct PostgresAccountStore {
    pool: Arc<PgPool>,
    starting_balance: i64,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_starting_balance(pool, DEFAULT_STARTING_BALANCE)
    }

    pub fn with_starting_balance(pool: PgPool, starting_balance: i64) -> Self {
        Self {
            pool: Arc::new(pool),
            starting_balance,
        }
    }

    /// Insert the account at the starting balance if it does not exist.
    /// `ON CONFLICT DO NOTHING` makes concurrent first-touches safe.
    async fn ensure_account(&self, account_id: AccountId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO token_accounts (account_id, balance) VALUES ($1, $2)
             ON CONFLICT (account_id) DO NOTHING",
        )
        .bind(account_id.as_uuid())
        .bind(self.starting_balance)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}

fn unavailable(e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl AccountStore for PostgresAccountStore {
    fn try_debit(&self, account_id: AccountId, amount: i64) -> Result<DebitOutcome, StoreError> {
        let handle = runtime_handle(StoreError::Unavailable)?;
        handle.block_on(async {
            self.ensure_account(account_id).await.map_err(unavailable)?;

            let debited = sqlx::query(
                "UPDATE token_accounts SET balance = balance - $2
                 WHERE account_id = $1 AND balance >= $2
                 RETURNING balance",
            )
            .bind(account_id.as_uuid())
            .bind(amount)
            .fetch_optional(&*self.pool)
            .await
            .map_err(unavailable)?;

            match debited {
                Some(row) => {
                    let remaining: i64 = row.try_get("balance").map_err(unavailable)?;
                    Ok(DebitOutcome::Debited { remaining })
                }
                None => {
                    let row = sqlx::query("SELECT balance FROM token_accounts WHERE account_id = $1")
                        .bind(account_id.as_uuid())
                        .fetch_one(&*self.pool)
                        .await
                        .map_err(unavailable)?;
                    let have: i64 = row.try_get("balance").map_err(unavailable)?;
                    Ok(DebitOutcome::Insufficient { have })
                }
            }
        })
    }

    fn credit(&self, account_id: AccountId, amount: i64) -> Result<i64, StoreError> {
        let handle = runtime_handle(StoreError::Unavailable)?;
        handle.block_on(async {
            self.ensure_account(account_id).await.map_err(unavailable)?;

            let row = sqlx::query(
                "UPDATE token_accounts SET balance = balance + $2
                 WHERE account_id = $1
                 RETURNING balance",
            )
            .bind(account_id.as_uuid())
            .bind(amount)
            .fetch_one(&*self.pool)
            .await
            .map_err(unavailable)?;

            row.try_get("balance").map_err(unavailable)
        })
    }

    fn balance_of(&self, account_id: AccountId) -> Result<i64, StoreError> {
        let handle = runtime_handle(StoreError::Unavailable)?;
        handle.block_on(async {
            self.ensure_account(account_id).await.map_err(unavailable)?;

            let row = sqlx::query("SELECT balance FROM token_accounts WHERE account_id = $1")
                .bind(account_id.as_uuid())
                .fetch_one(&*self.pool)
                .await
                .map_err(unavailable)?;

            row.try_get("balance").map_err(unavailable)
        })
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let handle = runtime_handle(StoreError::Unavailable)?;
        handle.block_on(async {
            let rows = sqlx::query("SELECT account_id, balance FROM token_accounts")
                .fetch_all(&*self.pool)
                .await
                .map_err(unavailable)?;

            rows.into_iter()
                .map(|row| {
                    let account_id: uuid::Uuid = row.try_get("account_id").map_err(unavailable)?;
                    let balance: i64 = row.try_get("balance").map_err(unavailable)?;
                    Ok(Account {
                        account_id: AccountId::from_uuid(account_id),
                        balance,
                    })
                })
                .collect()
        })
    }
}

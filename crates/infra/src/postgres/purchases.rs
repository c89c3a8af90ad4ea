use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use renolens_billing::{PurchaseRecord, PurchaseStatus, PurchaseStore, PurchaseStoreError};
use renolens_core::{AccountId, PurchaseId};

use super::runtime_handle;

/// Postgres-backed purchase trail. Append-only by construction: there are no
/// UPDATE or DELETE statements in this module.
pub struct PostgresPurchaseStore {
    pool: Arc<PgPool>,
}

impl PostgresPurchaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn unavailable(e: impl std::fmt::Display) -> PurchaseStoreError {
    PurchaseStoreError::Unavailable(e.to_string())
}

fn record_from_row(row: sqlx::postgres::PgRow) -> Result<PurchaseRecord, PurchaseStoreError> {
    let status: String = row.try_get("status").map_err(unavailable)?;
    let status = match status.as_str() {
        "completed" => PurchaseStatus::Completed,
        other => return Err(unavailable(format!("unknown purchase status: {other}"))),
    };

    Ok(PurchaseRecord {
        purchase_id: PurchaseId::from_uuid(row.try_get("purchase_id").map_err(unavailable)?),
        account_id: AccountId::from_uuid(row.try_get("account_id").map_err(unavailable)?),
        package_name: row.try_get("package_name").map_err(unavailable)?,
        base_tokens: row.try_get("base_tokens").map_err(unavailable)?,
        bonus_tokens: row.try_get("bonus_tokens").map_err(unavailable)?,
        total_tokens: row.try_get("total_tokens").map_err(unavailable)?,
        price_cents: row.try_get("price_cents").map_err(unavailable)?,
        currency: row.try_get("currency").map_err(unavailable)?,
        status,
        created_at: row.try_get("created_at").map_err(unavailable)?,
    })
}

const PURCHASE_COLUMNS: &str = "purchase_id, account_id, package_name, base_tokens, \
     bonus_tokens, total_tokens, price_cents, currency, status, created_at";

impl PurchaseStore for PostgresPurchaseStore {
    fn append(&self, record: &PurchaseRecord) -> Result<(), PurchaseStoreError> {
        let handle = runtime_handle(PurchaseStoreError::Unavailable)?;
        handle.block_on(async {
            let result = sqlx::query(
                "INSERT INTO purchases (purchase_id, account_id, package_name, base_tokens, \
                 bonus_tokens, total_tokens, price_cents, currency, status, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(record.purchase_id.as_uuid())
            .bind(record.account_id.as_uuid())
            .bind(&record.package_name)
            .bind(record.base_tokens)
            .bind(record.bonus_tokens)
            .bind(record.total_tokens)
            .bind(record.price_cents)
            .bind(&record.currency)
            .bind("completed")
            .bind(record.created_at)
            .execute(&*self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    Err(PurchaseStoreError::Duplicate(record.purchase_id))
                }
                Err(e) => Err(unavailable(e)),
            }
        })
    }

    fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PurchaseRecord>, PurchaseStoreError> {
        let handle = runtime_handle(PurchaseStoreError::Unavailable)?;
        handle.block_on(async {
            let rows = sqlx::query(&format!(
                "SELECT {PURCHASE_COLUMNS} FROM purchases \
                 WHERE created_at >= $1 AND created_at < $2 \
                 ORDER BY created_at, purchase_id",
            ))
            .bind(start)
            .bind(end)
            .fetch_all(&*self.pool)
            .await
            .map_err(unavailable)?;

            rows.into_iter().map(record_from_row).collect()
        })
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<PurchaseRecord>, PurchaseStoreError> {
        let handle = runtime_handle(PurchaseStoreError::Unavailable)?;
        handle.block_on(async {
            let rows = sqlx::query(&format!(
                "SELECT {PURCHASE_COLUMNS} FROM purchases \
                 ORDER BY created_at DESC, purchase_id DESC LIMIT $1",
            ))
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(unavailable)?;

            rows.into_iter().map(record_from_row).collect()
        })
    }
}

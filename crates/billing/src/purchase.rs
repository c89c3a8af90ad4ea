use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use renolens_core::{AccountId, DomainError, DomainResult, PurchaseId};

/// Currency recorded when the checkout boundary does not supply one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Payment status of a purchase record. This core only ever writes
/// `Completed`; the enum exists because the audit trail is read by tools
/// that must not assume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Completed,
}

/// An immutable, append-only record of one completed token purchase.
///
/// Invariant: `total_tokens = base_tokens + bonus_tokens`, enforced at
/// construction. Once written to a store the record never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub purchase_id: PurchaseId,
    pub account_id: AccountId,
    pub package_name: String,
    pub base_tokens: i64,
    pub bonus_tokens: i64,
    pub total_tokens: i64,
    /// Price in the currency's smallest unit (e.g. cents).
    pub price_cents: i64,
    pub currency: String,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
}

impl PurchaseRecord {
    /// Build a record, validating the checkout boundary's inputs: price must
    /// be positive, token amounts non-negative.
    pub fn new(
        account_id: AccountId,
        package_name: impl Into<String>,
        base_tokens: i64,
        bonus_tokens: i64,
        price_cents: i64,
        currency: impl Into<String>,
    ) -> DomainResult<Self> {
        if price_cents <= 0 {
            return Err(DomainError::validation(format!(
                "price must be positive, got {price_cents}"
            )));
        }
        if base_tokens < 0 || bonus_tokens < 0 {
            return Err(DomainError::validation(
                "token amounts must be non-negative",
            ));
        }
        let total_tokens = base_tokens + bonus_tokens;
        if total_tokens == 0 {
            return Err(DomainError::validation("purchase must grant tokens"));
        }

        Ok(Self {
            purchase_id: PurchaseId::new(),
            account_id,
            package_name: package_name.into(),
            base_tokens,
            bonus_tokens,
            total_tokens,
            price_cents,
            currency: currency.into(),
            status: PurchaseStatus::Completed,
            created_at: Utc::now(),
        })
    }
}

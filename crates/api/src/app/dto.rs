use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use renolens_billing::{PurchaseRecord, TokenPackage};
use renolens_core::AccountId;
use renolens_ledger::Account;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// The account the caller claims to act for; must match the token's
    /// subject or the request is rejected.
    pub account_id: AccountId,
    /// Input image, standard base64.
    pub image_base64: String,
    pub mime_type: String,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub package_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    /// `today` (default), `7d`, or `30d`.
    pub window: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentPurchasesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseStreamQuery {
    /// UTC day to watch, `YYYY-MM-DD`; defaults to today.
    pub date: Option<chrono::NaiveDate>,
}

// -------------------------
// Helpers / response mapping
// -------------------------

pub fn decode_image(image_base64: &str) -> Result<Vec<u8>, axum::response::Response> {
    BASE64.decode(image_base64).map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_image",
            "image_base64 is not valid base64",
        )
    })
}

pub fn encode_image(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn purchase_record_to_json(record: &PurchaseRecord) -> serde_json::Value {
    json!({
        "purchase_id": record.purchase_id.to_string(),
        "account_id": record.account_id.to_string(),
        "package_name": record.package_name,
        "base_tokens": record.base_tokens,
        "bonus_tokens": record.bonus_tokens,
        "total_tokens": record.total_tokens,
        "price_cents": record.price_cents,
        "currency": record.currency,
        "status": record.status,
        "created_at": record.created_at.to_rfc3339(),
    })
}

pub fn package_to_json(package: &TokenPackage) -> serde_json::Value {
    json!({
        "id": package.id,
        "name": package.name,
        "base_tokens": package.base_tokens,
        "bonus_tokens": package.bonus_tokens,
        "total_tokens": package.total_tokens(),
        "price_cents": package.price_cents,
        "popular": package.popular,
    })
}

pub fn account_to_json(account: &Account) -> serde_json::Value {
    json!({
        "account_id": account.account_id.to_string(),
        "balance": account.balance,
    })
}

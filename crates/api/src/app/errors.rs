use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use renolens_billing::PurchaseError;
use renolens_generation::GenerationError;
use renolens_ledger::LedgerError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 402 carries balance and cost so the client can prompt a top-up.
pub fn generation_error_to_response(err: GenerationError) -> axum::response::Response {
    match err {
        GenerationError::AuthenticationFailed(e) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string())
        }
        GenerationError::InsufficientBalance { needed, have } => (
            StatusCode::PAYMENT_REQUIRED,
            axum::Json(json!({
                "error": "insufficient_tokens",
                "message": format!("need {needed} tokens, have {have}"),
                "required": needed,
                "balance": have,
            })),
        )
            .into_response(),
        GenerationError::ExternalCallFailed { detail, balance, cost } => (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({
                "error": "generation_failed",
                "message": detail,
                "balance": balance,
                "cost": cost,
                "refunded": true,
            })),
        )
            .into_response(),
        GenerationError::Ledger(e) => ledger_error_to_response(e),
        GenerationError::Internal(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string())
        }
    }
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::InsufficientBalance { needed, have } => json_error(
            StatusCode::PAYMENT_REQUIRED,
            "insufficient_tokens",
            format!("need {needed} tokens, have {have}"),
        ),
        LedgerError::InvalidAmount(n) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_amount",
            format!("invalid amount: {n}"),
        ),
        LedgerError::UnknownReservation(id) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_reservation",
            format!("unknown reservation: {id}"),
        ),
        LedgerError::Store(e) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e.to_string())
        }
    }
}

pub fn purchase_error_to_response(err: PurchaseError) -> axum::response::Response {
    match err {
        PurchaseError::Invalid(e) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_purchase", e.to_string())
        }
        PurchaseError::WriteFailed(e) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e.to_string())
        }
        // The record exists; the balance catches up via reconciliation.
        PurchaseError::CreditInconsistency { purchase_id, source } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "credit_pending",
            format!("purchase {purchase_id} recorded; credit pending: {source}"),
        ),
    }
}

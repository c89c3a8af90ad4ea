use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use renolens_generation::GENERATION_COST;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::AccountContext;

/// GET /api/tokens
///
/// Balance for the authenticated account (created at the starting balance
/// on first sight), plus the current per-generation cost.
pub async fn get_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
) -> axum::response::Response {
    let account_id = ctx.account_id();
    let ledger = Arc::clone(&services.ledger);

    let balance = tokio::task::spawn_blocking(move || ledger.balance_of(account_id)).await;
    match balance {
        Ok(Ok(balance)) => (
            StatusCode::OK,
            Json(json!({
                "account_id": account_id.to_string(),
                "balance": balance,
                "generation_cost": GENERATION_COST,
            })),
        )
            .into_response(),
        Ok(Err(e)) => errors::ledger_error_to_response(e),
        Err(_) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "balance lookup failed",
        ),
    }
}

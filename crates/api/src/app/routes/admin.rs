//! Operator-only read surface: revenue windows, purchase history, accounts.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde_json::json;

use renolens_revenue::RevenueStats;

use crate::app::routes::purchase_stream;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;

pub fn router() -> Router {
    Router::new()
        .route("/revenue", get(revenue))
        .route("/purchases", get(recent_purchases))
        .route("/purchases/stream", get(purchase_stream::stream_purchases))
        .route("/accounts", get(list_accounts))
}

pub(crate) fn require_operator(ctx: &AccountContext) -> Result<(), axum::response::Response> {
    if ctx.is_operator() {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "operator role required",
        ))
    }
}

/// GET /admin/revenue?window=today|7d|30d
pub async fn revenue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    Query(query): Query<dto::RevenueQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_operator(&ctx) {
        return resp;
    }

    let window = query.window.unwrap_or_else(|| "today".to_string());
    let revenue = Arc::clone(&services.revenue);
    let now = Utc::now();

    let stats: Result<Result<RevenueStats, _>, _> = match window.as_str() {
        "today" => tokio::task::spawn_blocking(move || revenue.today(now)).await,
        "7d" => tokio::task::spawn_blocking(move || revenue.trailing_days(7, now)).await,
        "30d" => tokio::task::spawn_blocking(move || revenue.trailing_days(30, now)).await,
        other => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_window",
                format!("unknown window {other:?}; expected today, 7d, or 30d"),
            );
        }
    };

    match stats {
        Ok(Ok(stats)) => (
            StatusCode::OK,
            Json(json!({
                "window": window,
                "total_revenue_cents": stats.total_revenue_cents,
                "total_purchases": stats.total_purchases,
                "total_tokens_sold": stats.total_tokens_sold,
            })),
        )
            .into_response(),
        Ok(Err(e)) => errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            e.to_string(),
        ),
        Err(_) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "revenue query failed",
        ),
    }
}

/// GET /admin/purchases?limit=N (most recent first, default 100)
pub async fn recent_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    Query(query): Query<dto::RecentPurchasesQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_operator(&ctx) {
        return resp;
    }

    let limit = query.limit.unwrap_or(100);
    let purchases = Arc::clone(&services.purchases);

    match tokio::task::spawn_blocking(move || purchases.list_recent(limit)).await {
        Ok(Ok(records)) => {
            let items = records
                .iter()
                .map(dto::purchase_record_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Ok(Err(e)) => errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            e.to_string(),
        ),
        Err(_) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "purchase query failed",
        ),
    }
}

/// GET /admin/accounts (balance snapshot of every known account)
pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
) -> axum::response::Response {
    if let Err(resp) = require_operator(&ctx) {
        return resp;
    }

    let accounts = Arc::clone(&services.accounts);
    match tokio::task::spawn_blocking(move || accounts.list_accounts()).await {
        Ok(Ok(accounts)) => {
            let items = accounts.iter().map(dto::account_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Ok(Err(e)) => errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            e.to_string(),
        ),
        Err(_) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "account query failed",
        ),
    }
}

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use renolens_billing::{TOKEN_PACKAGES, package_by_id};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;

/// GET /api/packages
pub async fn list_packages() -> axum::response::Response {
    let packages = TOKEN_PACKAGES
        .iter()
        .map(dto::package_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(json!({ "packages": packages }))).into_response()
}

/// POST /api/purchases
///
/// Records a completed purchase of a catalog package for the authenticated
/// account and credits its tokens.
pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    Json(body): Json<dto::PurchaseRequest>,
) -> axum::response::Response {
    let Some(package) = package_by_id(&body.package_id) else {
        return errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_package",
            format!("unknown package: {}", body.package_id),
        );
    };

    let account_id = ctx.account_id();
    let recorder = Arc::clone(&services.recorder);

    let result =
        tokio::task::spawn_blocking(move || recorder.buy_package(account_id, package)).await;

    match result {
        Ok(Ok(receipt)) => (
            StatusCode::CREATED,
            Json(json!({
                "purchase": dto::purchase_record_to_json(&receipt.record),
                "balance": receipt.balance,
            })),
        )
            .into_response(),
        Ok(Err(e)) => errors::purchase_error_to_response(e),
        Err(_) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "purchase task failed",
        ),
    }
}

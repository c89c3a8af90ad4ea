use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use renolens_generation::JobInput;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::BearerToken;

/// POST /api/generate
///
/// Runs one metered generation. The executor re-verifies the bearer token
/// against `account_id` from the body, so a valid token for account A can
/// never spend account B's tokens.
pub async fn generate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    Json(body): Json<dto::GenerateRequest>,
) -> axum::response::Response {
    if body.prompt.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation", "prompt must not be empty");
    }

    let image_data = match dto::decode_image(&body.image_base64) {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };

    let input = JobInput {
        image_data,
        mime_type: body.mime_type,
        prompt: body.prompt,
    };

    match services.executor.execute(body.account_id, &token, input).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "job_id": receipt.job_id.to_string(),
                "image_base64": dto::encode_image(&receipt.output.bytes),
                "mime_type": receipt.output.mime,
                "tokens_charged": receipt.tokens_charged,
                "balance": receipt.remaining_balance,
            })),
        )
            .into_response(),
        Err(e) => errors::generation_error_to_response(e),
    }
}

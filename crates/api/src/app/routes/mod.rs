use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod generate;
pub mod packages;
pub mod purchase_stream;
pub mod system;
pub mod tokens;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/api/generate", post(generate::generate))
        .route("/api/tokens", get(tokens::get_balance))
        .route("/api/packages", get(packages::list_packages))
        .route("/api/purchases", post(packages::create_purchase))
        .nest("/admin", admin::router())
}

//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/ledger/executor wiring and the background worker
//! - `routes/`: HTTP routes + handlers (one file per surface area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use renolens_auth::IdentityVerifier;

use crate::jwt::Hs256Verifier;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: String) -> Router {
    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(Hs256Verifier::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState {
        verifier: Arc::clone(&verifier),
    };

    let services = Arc::new(services::build_services(verifier));

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}

use chrono::{DateTime, Utc};
use thiserror::Error;

use renolens_core::AccountId;

use crate::claims::{BearerClaims, TokenValidationError};

/// Why a caller could not be authenticated.
///
/// All variants are terminal for the request: no reservation is ever
/// attempted on an unauthenticated call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token could not be decoded or its signature did not verify.
    #[error("authentication failed: {0}")]
    InvalidToken(String),

    /// The token decoded but its claims are outside their validity window.
    #[error("authentication failed: {0}")]
    InvalidClaims(#[from] TokenValidationError),

    /// The token authenticates a different account than the one the request
    /// claims to act for.
    #[error("authentication failed: token subject does not match account {requested}")]
    SubjectMismatch { requested: AccountId },
}

/// Credential-system boundary.
///
/// Implementations decode and signature-check a bearer token and return its
/// claims; callers trust the result as-is. The concrete HS256 implementation
/// lives in the api crate.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<BearerClaims, AuthError>;
}

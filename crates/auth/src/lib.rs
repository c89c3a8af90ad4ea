//! `renolens-auth` — pure authentication boundary.
//!
//! This crate is intentionally decoupled from HTTP and from any concrete
//! credential system: it defines the claims model, deterministic claim
//! validation, and the [`IdentityVerifier`] seam the executor and api trust
//! as-is. Signature verification lives with the transport (api crate).

pub mod claims;
pub mod roles;
pub mod verifier;

pub use claims::{BearerClaims, TokenValidationError, validate_claims};
pub use roles::{OPERATOR, Role, is_operator};
pub use verifier::{AuthError, IdentityVerifier};

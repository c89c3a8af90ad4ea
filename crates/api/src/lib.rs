//! `renolens-api` — the HTTP surface.
//!
//! Thin handlers over the ledger, generation, billing, and revenue services.
//! Authentication happens twice on the generation path on purpose: once at
//! the middleware (request admission) and once inside the executor (no
//! unverified caller ever reaches the ledger).

pub mod app;
pub mod context;
pub mod jwt;
pub mod middleware;

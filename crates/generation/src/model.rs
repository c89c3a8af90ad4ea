use async_trait::async_trait;
use thiserror::Error;

use crate::job::{GeneratedImage, JobInput};

/// Failure reported by the generation provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider responded but produced no image.
    #[error("provider returned no image")]
    EmptyResult,
}

/// The paid external image-generation call.
///
/// Treated as a black box with unspecified latency and no idempotency
/// guarantee: the executor invokes it at most once per job and never retries
/// automatically. Implementations must not touch ledger state.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn invoke(&self, input: JobInput) -> Result<GeneratedImage, ModelError>;
}

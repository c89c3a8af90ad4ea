//! `renolens-generation` — the metered generation gateway.
//!
//! Orchestrates a single paid image-generation call: authenticate, reserve
//! tokens, invoke the provider at most once, then commit or refund
//! based on the outcome. The provider itself is opaque behind [`ImageModel`].

pub mod executor;
pub mod job;
pub mod model;

pub use executor::{ExecutorConfig, GenerationError, GenerationExecutor, GenerationReceipt};
pub use job::{GENERATION_COST, GeneratedImage, GenerationJob, JobInput, JobState};
pub use model::{ImageModel, ModelError};

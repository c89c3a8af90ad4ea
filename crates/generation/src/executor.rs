//! The metered job executor: authenticate, reserve, invoke, settle.
//!
//! Per job the ledger sees exactly one mutation sequence: (reserve, commit)
//! for a net `-cost`, or (reserve, refund) for net zero. The paid call runs
//! inside a spawned task so a caller-initiated cancellation can never abandon
//! a held reservation: the task settles the reservation whether or not the
//! request future is still being polled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use renolens_auth::{AuthError, IdentityVerifier};
use renolens_core::{AccountId, DomainError, JobId};
use renolens_ledger::{LedgerError, LedgerService, ReservationToken, StoreError};

use crate::job::{GENERATION_COST, GeneratedImage, GenerationJob, JobInput, JobState};
use crate::model::ImageModel;

/// Executor tuning. The cost is a system-wide constant; the timeout bounds
/// how long a hung provider can keep a reservation open.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub cost: i64,
    pub call_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            cost: GENERATION_COST,
            call_timeout: Duration::from_secs(45),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Identity could not be verified; no reservation was attempted.
    #[error(transparent)]
    AuthenticationFailed(#[from] AuthError),

    /// Balance check failed; no mutation occurred.
    #[error("insufficient balance: need {needed} tokens, have {have}")]
    InsufficientBalance { needed: i64, have: i64 },

    /// The provider call failed or timed out; the reservation was refunded
    /// before this surfaced. `balance` and `cost` let the caller decide to
    /// top up or retry.
    #[error("generation failed: {detail}")]
    ExternalCallFailed { detail: String, balance: i64, cost: i64 },

    /// The ledger itself failed; the job fails closed.
    #[error("ledger failure: {0}")]
    Ledger(LedgerError),

    /// Job state bookkeeping violated its own table.
    #[error("internal job error: {0}")]
    Internal(#[from] DomainError),
}

/// Result of a completed job.
#[derive(Debug, Clone)]
pub struct GenerationReceipt {
    pub job_id: JobId,
    pub output: GeneratedImage,
    pub tokens_charged: i64,
    pub remaining_balance: i64,
}

/// Orchestrates one metered generation per call to [`execute`].
///
/// [`execute`]: GenerationExecutor::execute
pub struct GenerationExecutor {
    verifier: Arc<dyn IdentityVerifier>,
    ledger: Arc<LedgerService>,
    model: Arc<dyn ImageModel>,
    config: ExecutorConfig,
}

impl GenerationExecutor {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        ledger: Arc<LedgerService>,
        model: Arc<dyn ImageModel>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            verifier,
            ledger,
            model,
            config,
        }
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Run one metered job for `account_id`, authenticated by `bearer_token`.
    ///
    /// The provider is invoked at most once; there is no automatic retry of
    /// the paid call. Every call resolves to a terminal state with a definite
    /// balance effect.
    pub async fn execute(
        &self,
        account_id: AccountId,
        bearer_token: &str,
        input: JobInput,
    ) -> Result<GenerationReceipt, GenerationError> {
        let mut job = GenerationJob::new(account_id, self.config.cost);

        // Identity first: an unverified caller never touches the ledger.
        let claims = match self.verifier.verify(bearer_token, Utc::now()) {
            Ok(claims) => claims,
            Err(e) => {
                job.transition(JobState::AuthFailed)?;
                tracing::info!(job_id = %job.job_id(), "generation rejected: {e}");
                return Err(e.into());
            }
        };
        if claims.sub != account_id {
            job.transition(JobState::AuthFailed)?;
            return Err(AuthError::SubjectMismatch {
                requested: account_id,
            }
            .into());
        }

        job.transition(JobState::Reserving)?;
        let cost = self.config.cost;
        let reserve_result =
            on_blocking(Arc::clone(&self.ledger), move |l| l.reserve(account_id, cost)).await;
        let reservation = match reserve_result {
            Ok(token) => token,
            Err(LedgerError::InsufficientBalance { needed, have }) => {
                job.transition(JobState::Rejected)?;
                tracing::info!(job_id = %job.job_id(), %account_id, needed, have, "generation rejected: insufficient balance");
                return Err(GenerationError::InsufficientBalance { needed, have });
            }
            Err(e) => {
                job.transition(JobState::Rejected)?;
                return Err(GenerationError::Ledger(e));
            }
        };
        job.transition(JobState::InFlight)?;

        // Invoke + settle in a spawned task. If the caller stops polling,
        // the reservation still resolves; a timeout counts as a call failure.
        let settled = {
            let ledger = Arc::clone(&self.ledger);
            let model = Arc::clone(&self.model);
            let reservation = reservation.clone();
            let call_timeout = self.config.call_timeout;
            let mut job = job;

            tokio::spawn(async move {
                let outcome = tokio::time::timeout(call_timeout, model.invoke(input)).await;
                match outcome {
                    Ok(Ok(image)) => {
                        job.transition(JobState::Committing)?;
                        let commit_reservation = reservation.clone();
                        on_blocking(Arc::clone(&ledger), move |l| l.commit(&commit_reservation))
                            .await
                            .map_err(GenerationError::Ledger)?;
                        job.transition(JobState::Completed)?;
                        Ok((job, image))
                    }
                    Ok(Err(model_err)) => {
                        job.transition(JobState::Refunding)?;
                        Err(settle_failure(ledger, reservation, job, model_err.to_string()).await)
                    }
                    Err(_elapsed) => {
                        job.transition(JobState::Refunding)?;
                        let detail =
                            format!("provider call timed out after {}s", call_timeout.as_secs());
                        Err(settle_failure(ledger, reservation, job, detail).await)
                    }
                }
            })
        };

        match settled.await {
            Ok(Ok((job, image))) => {
                tracing::info!(
                    job_id = %job.job_id(),
                    %account_id,
                    tokens_charged = self.config.cost,
                    remaining = reservation.balance_after(),
                    "generation completed"
                );
                Ok(GenerationReceipt {
                    job_id: job.job_id(),
                    output: image,
                    tokens_charged: self.config.cost,
                    remaining_balance: reservation.balance_after(),
                })
            }
            Ok(Err(e)) => Err(e),
            Err(join_err) => {
                // The settle task itself died; the sweep will reclaim the
                // reservation if it was left held.
                tracing::error!(error = %join_err, "generation settle task failed");
                let balance = on_blocking(Arc::clone(&self.ledger), move |l| l.balance_of(account_id))
                    .await
                    .unwrap_or(reservation.balance_after());
                Err(GenerationError::ExternalCallFailed {
                    detail: "generation task failed before settling".to_string(),
                    balance,
                    cost: self.config.cost,
                })
            }
        }
    }
}

/// Run a ledger operation on the blocking pool. Store adapters may block on
/// I/O, so they never run directly on an async task.
async fn on_blocking<T, F>(ledger: Arc<LedgerService>, f: F) -> Result<T, LedgerError>
where
    T: Send + 'static,
    F: FnOnce(&LedgerService) -> Result<T, LedgerError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&ledger)).await {
        Ok(result) => result,
        Err(e) => Err(LedgerError::Store(StoreError::Unavailable(format!(
            "ledger task failed: {e}"
        )))),
    }
}

/// Refund after a failed or timed-out call, reporting balance + cost.
async fn settle_failure(
    ledger: Arc<LedgerService>,
    reservation: ReservationToken,
    mut job: GenerationJob,
    detail: String,
) -> GenerationError {
    let cost = job.cost();
    let refund_reservation = reservation.clone();
    match on_blocking(Arc::clone(&ledger), move |l| l.refund(&refund_reservation)).await {
        Ok(()) => {
            if let Err(e) = job.transition(JobState::Rejected) {
                return e.into();
            }
            // Best-effort balance for the error report; the refund itself
            // already landed.
            let account_id = job.account_id();
            let balance = on_blocking(ledger, move |l| l.balance_of(account_id))
                .await
                .unwrap_or(reservation.balance_after() + cost);
            tracing::warn!(job_id = %job.job_id(), %detail, balance, "generation failed; tokens refunded");
            GenerationError::ExternalCallFailed { detail, balance, cost }
        }
        Err(e) => {
            // Reservation stays held; the reconciliation sweep retries it.
            tracing::error!(job_id = %job.job_id(), error = %e, "refund failed after provider failure");
            GenerationError::Ledger(e)
        }
    }
}

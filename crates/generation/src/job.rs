use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use renolens_core::{AccountId, DomainError, JobId};

/// Tokens charged for one generation job. System-wide constant, not
/// negotiated per request.
pub const GENERATION_COST: i64 = 30;

/// What the caller wants generated: a source photo plus an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    pub image_data: Vec<u8>,
    pub mime_type: String,
    pub prompt: String,
}

/// Output of a successful provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Lifecycle of one metered job.
///
/// `AuthFailed`, `Rejected` and `Completed` are terminal. A job that reaches
/// `Reserving` always ends with a definite balance effect: `-cost`
/// (committed) or zero (refunded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Requested,
    Reserving,
    InFlight,
    Committing,
    Refunding,
    AuthFailed,
    Rejected,
    Completed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::AuthFailed | JobState::Rejected | JobState::Completed)
    }

    fn allows(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Requested, AuthFailed)
                | (Requested, Reserving)
                | (Reserving, Rejected)
                | (Reserving, InFlight)
                | (InFlight, Committing)
                | (InFlight, Refunding)
                | (Committing, Completed)
                | (Refunding, Rejected)
        )
    }
}

impl core::fmt::Display for JobState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            JobState::Requested => "requested",
            JobState::Reserving => "reserving",
            JobState::InFlight => "in_flight",
            JobState::Committing => "committing",
            JobState::Refunding => "refunding",
            JobState::AuthFailed => "auth_failed",
            JobState::Rejected => "rejected",
            JobState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// One metered generation job, exclusively owned by the executor for the
/// duration of a request. Transient: only the reservation it holds is
/// durable (as the already-applied balance decrement).
#[derive(Debug, Clone)]
pub struct GenerationJob {
    job_id: JobId,
    account_id: AccountId,
    cost: i64,
    state: JobState,
    reserved_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(account_id: AccountId, cost: i64) -> Self {
        Self {
            job_id: JobId::new(),
            account_id,
            cost,
            state: JobState::Requested,
            reserved_at: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn cost(&self) -> i64 {
        self.cost
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn reserved_at(&self) -> Option<DateTime<Utc>> {
        self.reserved_at
    }

    /// Advance the state machine, rejecting transitions outside the table.
    pub fn transition(&mut self, next: JobState) -> Result<(), DomainError> {
        if !self.state.allows(next) {
            return Err(DomainError::invariant(format!(
                "illegal job transition {} -> {}",
                self.state, next
            )));
        }
        if next == JobState::InFlight {
            self.reserved_at = Some(Utc::now());
        }
        self.state = next;
        Ok(())
    }
}

//! Background expiration checks.
//!
//! # Components
//!
//! - **ExpirationCheckJob**: one run over an owner's inventory. It queries the
//!   due window, posts one reminder per due item and marks it `SENT`.
//!
//! - **CronHost**: the recurring scheduler. It invokes registered workers on a
//!   fixed interval, keeps at most one registration per name and applies the
//!   retry backoff when a run asks for it.
//!
//! - **RegistrationGuard**: idempotent registration of the check at process
//!   start (keep-existing policy).
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pantry_watch::jobs::{CronHost, ExpirationCheckJob, RegistrationGuard, RetryPolicy};
//!
//! let config = pantry_watch::config::get_config()?;
//! let job = Arc::new(ExpirationCheckJob::from_config(store, sink, config)?);
//! let host = CronHost::new(RetryPolicy::from_config(&config.jobs)).await?;
//! host.start().await?;
//! RegistrationGuard::from_config(&config.jobs)
//!     .ensure_registered(&host, "owner-uid", job)
//!     .await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

mod expiration_check;
mod host;
mod registration;

pub use expiration_check::{CheckError, ExpirationCheckJob, ItemFailure, RunReport};
pub use host::{
    run_with_retry, CronHost, ExistingPolicy, HostScheduler, PeriodicRequest, Registration,
    RetryPolicy,
};
pub use registration::RegistrationGuard;

/// Parameters a scheduled invocation is started with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    pub owner_id: Option<String>,
}

impl JobInput {
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
        }
    }
}

/// What a finished run reports back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The run completed; per-item problems are listed in the report.
    Success(RunReport),
    /// A transient failure; the scheduler should invoke the job again later.
    Retry(String),
    /// Retrying cannot help.
    Failure(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, JobOutcome::Retry(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failure(_))
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            JobOutcome::Success(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success(report) => write!(
                f,
                "success ({} notified, {} update failures)",
                report.notified.len(),
                report.update_failures.len()
            ),
            JobOutcome::Retry(reason) => write!(f, "retry requested: {reason}"),
            JobOutcome::Failure(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A unit of work the scheduler can invoke.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn run(&self, input: &JobInput) -> JobOutcome;
}

/// Errors that can occur in the job scheduler.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(String),

    #[error("No job registered under '{0}'")]
    NotRegistered(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_predicates() {
        assert!(JobOutcome::Success(RunReport::default()).is_success());
        assert!(JobOutcome::Retry("network".into()).is_retry());
        assert!(JobOutcome::Failure("no owner".into()).is_failure());
        assert!(JobOutcome::Failure("no owner".into()).report().is_none());
    }

    #[test]
    fn input_serializes_owner() {
        let input = JobInput::for_owner("uid-1");
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["owner_id"], "uid-1");
    }
}

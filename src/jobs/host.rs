//! Recurring job host.
//!
//! [`HostScheduler`] is the seam the registration guard talks to; [`CronHost`]
//! implements it on top of `tokio-cron-scheduler`. A host keeps at most one
//! registration per name. What happens when a name is registered again is
//! decided by [`ExistingPolicy`].
//!
//! Registrations live in memory, so a restarted process always creates a
//! fresh one whose first tick is a full interval away. A host built with
//! [`CronHost::with_initial_run`] runs a job once right after it is created
//! or replaced; a kept registration is left alone.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::JobsConfig;

use super::{JobError, JobInput, JobOutcome, Worker};

/// What to do when a registration with the same name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingPolicy {
    /// Leave the existing registration untouched, including its phase.
    Keep,
    /// Drop the existing registration and schedule the new request.
    Replace,
}

/// Result of a registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created(Uuid),
    Kept(Uuid),
    Replaced(Uuid),
}

impl Registration {
    /// Scheduler id of the registration that is active afterwards.
    pub fn job_id(&self) -> Uuid {
        match *self {
            Registration::Created(id) | Registration::Kept(id) | Registration::Replaced(id) => id,
        }
    }
}

/// A recurring job to register.
#[derive(Clone)]
pub struct PeriodicRequest {
    pub name: String,
    pub interval: Duration,
    pub input: JobInput,
    pub worker: Arc<dyn Worker>,
}

impl fmt::Debug for PeriodicRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicRequest")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

/// Platform facility that invokes jobs on a recurring cadence.
#[async_trait]
pub trait HostScheduler: Send + Sync {
    /// Register `request` under its name, honouring `policy` if the name is taken.
    async fn register_periodic(
        &self,
        request: PeriodicRequest,
        policy: ExistingPolicy,
    ) -> Result<Registration, JobError>;

    /// Remove the registration under `name`. Returns `false` if there was none.
    async fn cancel(&self, name: &str) -> Result<bool, JobError>;

    async fn is_registered(&self, name: &str) -> bool;
}

/// Backoff applied when a run asks to be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Attempts per scheduled invocation, including the first one
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&JobsConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &JobsConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.retry_initial_secs),
            max_delay: Duration::from_secs(config.retry_max_secs),
            max_attempts: config.retry_max_attempts.max(1),
        }
    }

    /// Delay before retry number `retry` (1-based): doubles each time, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Invoke `worker` until it stops asking for a retry, attempts run out, or
/// `cancel` fires during a backoff wait.
pub async fn run_with_retry(
    worker: &dyn Worker,
    input: &JobInput,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> JobOutcome {
    let mut attempt = 1;

    loop {
        let outcome = worker.run(input).await;
        if !outcome.is_retry() {
            return outcome;
        }

        if attempt >= policy.max_attempts {
            warn!("Giving up after {} attempts: {}", attempt, outcome);
            return outcome;
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Attempt {} of {} ended with {}; retrying in {:?}",
            attempt, policy.max_attempts, outcome, delay
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                info!("Retry wait cancelled by shutdown");
                return outcome;
            }
        }

        attempt += 1;
    }
}

fn log_outcome(name: &str, outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Success(report) => {
            if report.notified.is_empty() {
                debug!("Job '{}' finished: {}", name, outcome);
            } else {
                info!("Job '{}' finished: {}", name, outcome);
            }
        }
        JobOutcome::Retry(_) => warn!("Job '{}' finished: {}", name, outcome),
        JobOutcome::Failure(_) => error!("Job '{}' finished: {}", name, outcome),
    }
}

struct RegisteredJob {
    job_id: Uuid,
    request: PeriodicRequest,
}

/// `tokio-cron-scheduler` backed host.
pub struct CronHost {
    scheduler: TokioJobScheduler,
    registrations: Mutex<HashMap<String, RegisteredJob>>,
    retry: RetryPolicy,
    shutdown: CancellationToken,
    initial_run: bool,
}

impl CronHost {
    /// Create a new host. Jobs only fire after [`CronHost::start`].
    pub async fn new(retry: RetryPolicy) -> Result<Self, JobError> {
        let scheduler = TokioJobScheduler::new()
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        Ok(Self {
            scheduler,
            registrations: Mutex::new(HashMap::new()),
            retry,
            shutdown: CancellationToken::new(),
            initial_run: false,
        })
    }

    /// Run each newly created or replaced job once without waiting for its first tick.
    pub fn with_initial_run(mut self, enabled: bool) -> Self {
        self.initial_run = enabled;
        self
    }

    /// Start firing registered jobs.
    pub async fn start(&self) -> Result<(), JobError> {
        info!("Starting job host");
        self.scheduler
            .start()
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))
    }

    /// Stop the scheduler and abort pending retry waits.
    pub async fn shutdown(&mut self) -> Result<(), JobError> {
        info!("Shutting down job host");
        self.shutdown.cancel();
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))
    }

    /// Run the job registered under `name` immediately, with retries.
    pub async fn run_now(&self, name: &str) -> Result<JobOutcome, JobError> {
        let (worker, input) = {
            let registrations = self.registrations.lock().await;
            let registered = registrations
                .get(name)
                .ok_or_else(|| JobError::NotRegistered(name.to_string()))?;
            (
                Arc::clone(&registered.request.worker),
                registered.request.input.clone(),
            )
        };

        let outcome = run_with_retry(worker.as_ref(), &input, &self.retry, &self.shutdown).await;
        log_outcome(name, &outcome);
        Ok(outcome)
    }

    /// Names of all active registrations.
    pub async fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registrations.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    fn spawn_initial_run(&self, request: &PeriodicRequest) {
        let worker = Arc::clone(&request.worker);
        let input = request.input.clone();
        let retry = self.retry.clone();
        let cancel = self.shutdown.clone();
        let name = request.name.clone();

        tokio::spawn(async move {
            info!("Running job '{}' once after registration", name);
            let outcome = run_with_retry(worker.as_ref(), &input, &retry, &cancel).await;
            log_outcome(&name, &outcome);
        });
    }

    async fn add_job(&self, request: &PeriodicRequest) -> Result<Uuid, JobError> {
        if request.interval.is_zero() {
            return Err(JobError::SchedulerError(format!(
                "job '{}' needs a non-zero interval",
                request.name
            )));
        }

        let worker = Arc::clone(&request.worker);
        let input = request.input.clone();
        let retry = self.retry.clone();
        let cancel = self.shutdown.clone();
        let name = request.name.clone();

        let job = Job::new_repeated_async(request.interval, move |_uuid, _l| {
            let worker = Arc::clone(&worker);
            let input = input.clone();
            let retry = retry.clone();
            let cancel = cancel.clone();
            let name = name.clone();
            Box::pin(async move {
                info!("Running scheduled job '{}'", name);
                let outcome = run_with_retry(worker.as_ref(), &input, &retry, &cancel).await;
                log_outcome(&name, &outcome);
            })
        })
        .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))
    }
}

#[async_trait]
impl HostScheduler for CronHost {
    async fn register_periodic(
        &self,
        request: PeriodicRequest,
        policy: ExistingPolicy,
    ) -> Result<Registration, JobError> {
        // Held across the whole check-then-add so concurrent callers cannot both create.
        let mut registrations = self.registrations.lock().await;

        let existing = registrations.get(&request.name).map(|r| r.job_id);
        let registration = match (existing, policy) {
            (Some(job_id), ExistingPolicy::Keep) => {
                debug!("Keeping existing registration of '{}'", request.name);
                return Ok(Registration::Kept(job_id));
            }
            (Some(old_id), ExistingPolicy::Replace) => {
                // Old job stays scheduled until its successor is in place.
                let new_id = self.add_job(&request).await?;
                if let Err(e) = self.scheduler.remove(&old_id).await {
                    if let Err(rollback) = self.scheduler.remove(&new_id).await {
                        error!("Failed to roll back job '{}': {}", request.name, rollback);
                    }
                    return Err(JobError::SchedulerError(e.to_string()));
                }
                Registration::Replaced(new_id)
            }
            (None, _) => Registration::Created(self.add_job(&request).await?),
        };

        info!(
            "Registered job '{}' every {:?} ({:?})",
            request.name, request.interval, registration
        );

        if self.initial_run {
            self.spawn_initial_run(&request);
        }

        registrations.insert(
            request.name.clone(),
            RegisteredJob {
                job_id: registration.job_id(),
                request,
            },
        );

        Ok(registration)
    }

    async fn cancel(&self, name: &str) -> Result<bool, JobError> {
        let mut registrations = self.registrations.lock().await;
        let Some(registered) = registrations.remove(name) else {
            return Ok(false);
        };

        self.scheduler
            .remove(&registered.job_id)
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        info!("Cancelled job '{}'", name);
        Ok(true)
    }

    async fn is_registered(&self, name: &str) -> bool {
        self.registrations.lock().await.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(100),
            max_attempts: 5,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(2), Duration::from_secs(60));
        assert_eq!(policy.delay_for(3), Duration::from_secs(100));
        assert_eq!(policy.delay_for(40), Duration::from_secs(100));
    }

    #[test]
    fn default_policy_follows_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 5);
    }
}

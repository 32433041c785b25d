use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::JobsConfig;

use super::{ExistingPolicy, HostScheduler, JobError, JobInput, PeriodicRequest, Registration, Worker};

/// Registers the expiration check under a fixed name.
///
/// [`RegistrationGuard::ensure_registered`] is meant to be called on every
/// process start: the first call schedules the check, later calls leave the
/// running registration and its phase alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationGuard {
    name: String,
    interval: Duration,
}

impl RegistrationGuard {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
        }
    }

    pub fn from_config(config: &JobsConfig) -> Self {
        Self::new(config.name.clone(), config.interval())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn request(&self, owner_id: &str, worker: Arc<dyn Worker>) -> PeriodicRequest {
        PeriodicRequest {
            name: self.name.clone(),
            interval: self.interval,
            input: JobInput::for_owner(owner_id),
            worker,
        }
    }

    /// Schedule the check for `owner_id` unless it is already scheduled.
    pub async fn ensure_registered(
        &self,
        host: &dyn HostScheduler,
        owner_id: &str,
        worker: Arc<dyn Worker>,
    ) -> Result<Registration, JobError> {
        let registration = host
            .register_periodic(self.request(owner_id, worker), ExistingPolicy::Keep)
            .await?;

        if let Registration::Kept(_) = registration {
            info!("Expiration check '{}' already scheduled", self.name);
        }
        Ok(registration)
    }

    /// Replace any existing registration, e.g. after the signed-in owner changed.
    pub async fn reschedule(
        &self,
        host: &dyn HostScheduler,
        owner_id: &str,
        worker: Arc<dyn Worker>,
    ) -> Result<Registration, JobError> {
        host.register_periodic(self.request(owner_id, worker), ExistingPolicy::Replace)
            .await
    }

    /// Stop the recurring check, e.g. when the user turned notifications off.
    pub async fn cancel(&self, host: &dyn HostScheduler) -> Result<bool, JobError> {
        host.cancel(&self.name).await
    }
}

//! Expiration check job.
//!
//! One run queries the owner's records that are due for a reminder, and for
//! each of them, in store order:
//! - skips it if it has no ingredient name or expiration date,
//! - re-checks status and day distance against the window,
//! - posts the reminder,
//! - marks the record `SENT`.
//!
//! A failed status update is recorded and the run moves on to the next
//! record. Only a missing owner or a failed query end the run early.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::PantryConfig;
use crate::dday::days_remaining;
use crate::errors::{PantryError, PantryResult};
use crate::inventory::NotificationStatus;
use crate::logging::{log_item_event, ItemEvent};
use crate::notify::{
    DispatchOutcome, NotificationDispatcher, NotificationSink, NotifyError, ReminderTemplate,
};
use crate::store::InventoryStore;
use crate::validation::validate_owner_id;
use crate::window::ExpirationWindow;

use super::{JobInput, JobOutcome, Worker};

/// Default number of days after today that still count as due.
pub const DEFAULT_HORIZON_DAYS: u32 = 3;

/// Errors that end a run before all records are processed.
#[derive(Debug, Error)]
pub enum CheckError {
    /// No usable owner id; retrying cannot help.
    #[error("missing or invalid owner id: {0}")]
    MissingIdentity(String),

    /// The store could not be queried; worth retrying.
    #[error("inventory query failed: {0}")]
    QueryFailure(#[source] PantryError),

    /// The notification channel could not be created; worth retrying.
    #[error("notification channel setup failed: {0}")]
    ChannelSetup(#[source] NotifyError),
}

impl From<CheckError> for JobOutcome {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::MissingIdentity(_) => JobOutcome::Failure(err.to_string()),
            CheckError::QueryFailure(_) | CheckError::ChannelSetup(_) => {
                JobOutcome::Retry(err.to_string())
            }
        }
    }
}

/// A record that could not be completed, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub item_id: String,
    pub reason: String,
}

/// Per-record results of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records returned by the query
    pub examined: usize,
    /// Notified and marked `SENT`
    pub notified: Vec<String>,
    /// Missing ingredient name or expiration date
    pub skipped_incomplete: Vec<String>,
    /// Rejected by the in-run re-check of status, owner and day distance
    pub skipped_out_of_window: Vec<String>,
    /// Reminder withheld because notifications are not permitted; left `PENDING`
    pub permission_denied: Vec<String>,
    /// Reminder could not be delivered; left `PENDING`
    pub delivery_failures: Vec<ItemFailure>,
    /// Reminder was shown but the status could not be persisted
    pub update_failures: Vec<ItemFailure>,
}

impl RunReport {
    /// Whether any record hit a delivery or persistence problem.
    pub fn has_failures(&self) -> bool {
        !self.delivery_failures.is_empty() || !self.update_failures.is_empty()
    }
}

/// Scans one owner's inventory and sends at most one reminder per due record.
pub struct ExpirationCheckJob {
    store: Arc<dyn InventoryStore>,
    sink: Arc<dyn NotificationSink>,
    template: ReminderTemplate,
    horizon_days: u32,
    zone: FixedOffset,
    channel_ready: AtomicBool,
}

impl ExpirationCheckJob {
    /// Job with a three-day horizon, UTC day boundaries and default reminder text.
    pub fn new(store: Arc<dyn InventoryStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            store,
            sink,
            template: ReminderTemplate::default(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            zone: Utc.fix(),
            channel_ready: AtomicBool::new(false),
        }
    }

    pub fn from_config(
        store: Arc<dyn InventoryStore>,
        sink: Arc<dyn NotificationSink>,
        config: &PantryConfig,
    ) -> PantryResult<Self> {
        Ok(Self::new(store, sink)
            .with_horizon_days(config.jobs.horizon_days)
            .with_reference_zone(config.jobs.reference_zone()?)
            .with_template(ReminderTemplate::from_config(&config.notifications)))
    }

    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_reference_zone(mut self, zone: FixedOffset) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_template(mut self, template: ReminderTemplate) -> Self {
        self.template = template;
        self
    }

    /// Run the check as of `now` and map the result for the scheduler.
    pub async fn run_at(&self, input: &JobInput, now: DateTime<Utc>) -> JobOutcome {
        match self.check(input, now).await {
            Ok(report) => {
                if report.has_failures() {
                    warn!(
                        "Expiration check finished with {} delivery and {} update failures",
                        report.delivery_failures.len(),
                        report.update_failures.len()
                    );
                }
                JobOutcome::Success(report)
            }
            Err(e) => {
                error!("Expiration check failed: {}", e);
                e.into()
            }
        }
    }

    /// Run the check as of `now`.
    pub async fn check(&self, input: &JobInput, now: DateTime<Utc>) -> Result<RunReport, CheckError> {
        let owner_id = input.owner_id.as_deref().unwrap_or_default();
        validate_owner_id(owner_id, "owner_id")
            .map_err(|e| CheckError::MissingIdentity(e.to_string()))?;

        self.ensure_channel().await?;

        let window = ExpirationWindow::build(owner_id, now, self.horizon_days, &self.zone);
        debug!(
            "Checking items of {} expiring in [{}, {})",
            owner_id, window.starts_at, window.ends_before
        );

        let items = self
            .store
            .query_due(&window)
            .await
            .map_err(CheckError::QueryFailure)?;

        let mut report = RunReport {
            examined: items.len(),
            ..RunReport::default()
        };

        if items.is_empty() {
            debug!("No items due for a reminder");
            return Ok(report);
        }

        info!("{} items due for a reminder", items.len());

        let mut dispatcher = NotificationDispatcher::new(self.sink.as_ref(), &self.template);

        for item in items {
            let (name, expiration) = match (item.display_name(), item.expiration_date) {
                (Some(name), Some(expiration)) => (name, expiration),
                _ => {
                    log_item_event(
                        ItemEvent::Skipped,
                        &item.id,
                        Some("missing ingredient name or expiration date"),
                    );
                    report.skipped_incomplete.push(item.id);
                    continue;
                }
            };

            let days = days_remaining(now, expiration, &self.zone);
            if item.notification_status != NotificationStatus::Pending
                || item.owner_id != owner_id
                || !(0..=i64::from(self.horizon_days)).contains(&days)
            {
                debug!(
                    "Item {} outside the due window (status {}, {} days left)",
                    item.id, item.notification_status, days
                );
                report.skipped_out_of_window.push(item.id);
                continue;
            }

            match dispatcher.dispatch(name, days).await {
                Ok(DispatchOutcome::Delivered { notification_id }) => {
                    log_item_event(
                        ItemEvent::Notified,
                        &item.id,
                        Some(&format!("notification {notification_id}, {days} days left")),
                    );
                }
                Ok(DispatchOutcome::PermissionDenied) => {
                    log_item_event(ItemEvent::PermissionDenied, &item.id, None);
                    report.permission_denied.push(item.id);
                    continue;
                }
                Err(e) => {
                    log_item_event(ItemEvent::DeliveryFailed, &item.id, Some(&e.to_string()));
                    report.delivery_failures.push(ItemFailure {
                        item_id: item.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            match self
                .store
                .update_status(&item.id, NotificationStatus::Sent)
                .await
            {
                Ok(()) => {
                    log_item_event(ItemEvent::MarkedSent, &item.id, None);
                    report.notified.push(item.id);
                }
                Err(e) => {
                    log_item_event(ItemEvent::UpdateFailed, &item.id, Some(&e.to_string()));
                    report.update_failures.push(ItemFailure {
                        item_id: item.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Expiration check done: {} notified, {} skipped",
            report.notified.len(),
            report.skipped_incomplete.len() + report.skipped_out_of_window.len()
        );

        Ok(report)
    }

    async fn ensure_channel(&self) -> Result<(), CheckError> {
        if self.channel_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        self.sink
            .ensure_channel(&self.template.channel)
            .await
            .map_err(CheckError::ChannelSetup)?;
        self.channel_ready.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl Worker for ExpirationCheckJob {
    async fn run(&self, input: &JobInput) -> JobOutcome {
        self.run_at(input, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    // Integration tests are in tests/expiration_check_tests.rs
    use super::*;

    #[test]
    fn check_errors_map_to_outcomes() {
        let missing: JobOutcome =
            CheckError::MissingIdentity("owner_id: cannot be empty".into()).into();
        assert!(missing.is_failure());

        let query: JobOutcome =
            CheckError::QueryFailure(PantryError::StoreError("timeout".into())).into();
        assert!(query.is_retry());

        let channel: JobOutcome =
            CheckError::ChannelSetup(NotifyError::Channel("denied".into())).into();
        assert!(channel.is_retry());
    }
}

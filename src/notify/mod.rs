//! Reminder delivery.
//!
//! A [`NotificationSink`] is the platform service that shows alerts to the
//! user. The [`NotificationDispatcher`] turns "ingredient X has N days left"
//! into a [`Notification`] and hands it to the sink, numbering the alerts of
//! one run so they do not replace each other in the notification tray.
//!
//! Available sinks:
//! - [`LogSink`]       → writes reminders to the tracing log
//! - [`WebhookSink`]   → POSTs reminders as JSON to a push gateway
//! - [`RecordingSink`] → keeps reminders in memory for embedding hosts and tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::NotificationConfig;

mod log_sink;
mod recording;
mod webhook;

pub use log_sink::LogSink;
pub use recording::RecordingSink;
pub use webhook::WebhookSink;

/// Errors raised by notification sinks.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission not granted")]
    PermissionDenied,

    #[error("channel setup failed: {0}")]
    Channel(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivery channel the reminders are grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A single user-visible reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel_id: String,
    /// Unique within one run
    pub id: u32,
    pub title: String,
    pub body: String,
    pub tap_target: String,
}

/// Platform service that delivers user-visible alerts.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Create the channel if it does not exist yet. Must be idempotent.
    async fn ensure_channel(&self, channel: &ChannelSpec) -> Result<(), NotifyError>;

    /// Whether the user currently allows notifications.
    async fn permission_granted(&self) -> bool;

    /// Deliver a reminder. May fail with [`NotifyError::PermissionDenied`].
    async fn post(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Reminder text for an item with `days_remaining` left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryMessage {
    Today,
    InDays(i64),
}

impl ExpiryMessage {
    pub fn for_days(days_remaining: i64) -> Self {
        if days_remaining <= 0 {
            ExpiryMessage::Today
        } else {
            ExpiryMessage::InDays(days_remaining)
        }
    }

    /// Full reminder body for `ingredient`.
    pub fn render(&self, ingredient: &str) -> String {
        format!("{ingredient} {self}")
    }
}

impl fmt::Display for ExpiryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryMessage::Today => f.write_str("expires today!"),
            ExpiryMessage::InDays(1) => f.write_str("expires in 1 day."),
            ExpiryMessage::InDays(n) => write!(f, "expires in {n} days."),
        }
    }
}

/// Fixed parts of every reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderTemplate {
    pub channel: ChannelSpec,
    pub title: String,
    pub tap_target: String,
}

impl ReminderTemplate {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            channel: ChannelSpec {
                id: config.channel_id.clone(),
                name: config.channel_name.clone(),
                description: config.channel_description.clone(),
            },
            title: config.title.clone(),
            tap_target: config.tap_target.clone(),
        }
    }
}

impl Default for ReminderTemplate {
    fn default() -> Self {
        Self::from_config(&NotificationConfig::default())
    }
}

/// Result of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { notification_id: u32 },
    /// Nothing was shown; the caller skips the item and carries on.
    PermissionDenied,
}

/// Run-scoped reminder builder.
///
/// Identifiers start at 1 for every dispatcher and grow by one per post
/// attempt. A dispatcher must not be shared between concurrent runs.
pub struct NotificationDispatcher<'a> {
    sink: &'a dyn NotificationSink,
    template: &'a ReminderTemplate,
    next_id: u32,
}

impl<'a> NotificationDispatcher<'a> {
    pub fn new(sink: &'a dyn NotificationSink, template: &'a ReminderTemplate) -> Self {
        Self {
            sink,
            template,
            next_id: 1,
        }
    }

    /// Build and post the reminder for `ingredient` with `days_remaining` left.
    pub async fn dispatch(
        &mut self,
        ingredient: &str,
        days_remaining: i64,
    ) -> Result<DispatchOutcome, NotifyError> {
        if !self.sink.permission_granted().await {
            return Ok(DispatchOutcome::PermissionDenied);
        }

        let notification_id = self.next_id;
        self.next_id += 1;

        let notification = Notification {
            channel_id: self.template.channel.id.clone(),
            id: notification_id,
            title: self.template.title.clone(),
            body: ExpiryMessage::for_days(days_remaining).render(ingredient),
            tap_target: self.template.tap_target.clone(),
        };

        match self.sink.post(notification).await {
            Ok(()) => Ok(DispatchOutcome::Delivered { notification_id }),
            Err(NotifyError::PermissionDenied) => Ok(DispatchOutcome::PermissionDenied),
            Err(e) => Err(e),
        }
    }
}

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::info;

use super::{ChannelSpec, Notification, NotificationSink, NotifyError};

/// Sink that writes reminders to the tracing log.
#[derive(Debug)]
pub struct LogSink {
    permission_granted: bool,
    channels: Mutex<HashSet<String>>,
}

impl LogSink {
    pub fn new(permission_granted: bool) -> Self {
        Self {
            permission_granted,
            channels: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn ensure_channel(&self, channel: &ChannelSpec) -> Result<(), NotifyError> {
        if self.channels.lock().await.insert(channel.id.clone()) {
            info!(
                channel_id = %channel.id,
                channel_name = %channel.name,
                "Notification channel created"
            );
        }
        Ok(())
    }

    async fn permission_granted(&self) -> bool {
        self.permission_granted
    }

    async fn post(&self, notification: Notification) -> Result<(), NotifyError> {
        if !self.permission_granted {
            return Err(NotifyError::PermissionDenied);
        }

        info!(
            channel_id = %notification.channel_id,
            notification_id = notification.id,
            title = %notification.title,
            tap_target = %notification.tap_target,
            "{}",
            notification.body
        );
        Ok(())
    }
}

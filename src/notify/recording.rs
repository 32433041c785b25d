use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{ChannelSpec, Notification, NotificationSink, NotifyError};

/// Sink that keeps every reminder in memory.
#[derive(Debug)]
pub struct RecordingSink {
    permission: AtomicBool,
    channels: Mutex<Vec<ChannelSpec>>,
    posted: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    /// A sink with permission granted.
    pub fn new() -> Self {
        Self {
            permission: AtomicBool::new(true),
            channels: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Channels created so far, in creation order.
    pub async fn channels(&self) -> Vec<ChannelSpec> {
        self.channels.lock().await.clone()
    }

    /// Reminders posted so far, in posting order.
    pub async fn posted(&self) -> Vec<Notification> {
        self.posted.lock().await.clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn ensure_channel(&self, channel: &ChannelSpec) -> Result<(), NotifyError> {
        let mut channels = self.channels.lock().await;
        if !channels.iter().any(|c| c.id == channel.id) {
            channels.push(channel.clone());
        }
        Ok(())
    }

    async fn permission_granted(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn post(&self, notification: Notification) -> Result<(), NotifyError> {
        if !self.permission.load(Ordering::SeqCst) {
            return Err(NotifyError::PermissionDenied);
        }
        self.posted.lock().await.push(notification);
        Ok(())
    }
}

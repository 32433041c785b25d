use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{ChannelSpec, Notification, NotificationSink, NotifyError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body sent to the push gateway.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    channel: &'a ChannelSpec,
    notification: &'a Notification,
}

/// Sink that forwards reminders to an HTTP push gateway.
///
/// The gateway answers `403 Forbidden` when the user revoked notification
/// permission on the device; that is reported as
/// [`NotifyError::PermissionDenied`].
#[derive(Debug)]
pub struct WebhookSink {
    client: Client,
    url: String,
    permission_granted: bool,
    channels: Mutex<HashMap<String, ChannelSpec>>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, permission_granted: bool) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            permission_granted,
            channels: Mutex::new(HashMap::new()),
        })
    }

    async fn channel_for(&self, channel_id: &str) -> Result<ChannelSpec, NotifyError> {
        self.channels
            .lock()
            .await
            .get(channel_id)
            .cloned()
            .ok_or_else(|| NotifyError::Channel(format!("channel '{channel_id}' was never created")))
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn ensure_channel(&self, channel: &ChannelSpec) -> Result<(), NotifyError> {
        let mut channels = self.channels.lock().await;
        if !channels.contains_key(&channel.id) {
            debug!(channel_id = %channel.id, "Registering webhook channel");
            channels.insert(channel.id.clone(), channel.clone());
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

        let channel = self.channel_for(&notification.channel_id).await?;
        let payload = WebhookPayload {
            channel: &channel,
            notification: &notification,
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::FORBIDDEN => Err(NotifyError::PermissionDenied),
            s => {
                warn!(status = %s, "Push gateway rejected reminder");
                Err(NotifyError::Delivery(format!(
                    "push gateway answered with HTTP status {s}"
                )))
            }
        }
    }
}

//! ntfy push delivery

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use super::{Dispatcher, NotifyError};
use crate::config::NotifyConfig;
use crate::models::{Channel, Notification};

/// Sends notifications to an ntfy-compatible push server
pub struct NtfySender {
    client: Client,
    server: String,
    topic: String,
    debug_topic: Option<String>,
}

impl NtfySender {
    /// Create a new sender from notification configuration
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self {
            client,
            server: config.server.trim_end_matches('/').to_string(),
            topic: config.topic.clone(),
            debug_topic: config.debug_topic.clone(),
        })
    }

    fn topic_for(&self, channel: Channel) -> Result<&str, NotifyError> {
        match channel {
            Channel::Primary => Ok(&self.topic),
            Channel::Debug => self
                .debug_topic
                .as_deref()
                .ok_or_else(|| NotifyError::Config("debug channel not configured".to_string())),
        }
    }
}

#[async_trait]
impl Dispatcher for NtfySender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = NtfyPayload {
            topic: self.topic_for(notification.channel)?.to_string(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            priority: notification.priority,
            tags: notification.tags.clone(),
            click: Some(notification.click_url.clone()),
        };

        let response = self
            .client
            .post(&self.server)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http(format!(
                "ntfy returned {status}: {body}"
            )));
        }

        info!(
            kind = ?notification.kind,
            topic = %payload.topic,
            "Notification sent"
        );
        Ok(())
    }
}

// ntfy JSON publish payload
#[derive(Debug, Serialize)]
struct NtfyPayload {
    topic: String,
    title: String,
    message: String,
    priority: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    click: Option<String>,
}

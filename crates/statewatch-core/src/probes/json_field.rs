//! JSON API field probe

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{Observation, Probe};
use crate::config::TargetConfig;
use crate::error::{Error, Result};
use crate::models::{NotificationContent, PRIORITY_DEFAULT};

/// Watches one field of a JSON API response, addressed by JSON pointer
pub struct JsonFieldProbe {
    name: String,
    url: String,
    click_url: String,
    pointer: String,
    client: Client,
}

impl JsonFieldProbe {
    /// Create a probe from its target configuration
    pub fn new(target: &TargetConfig, pointer: &str, client: Client) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            click_url: target.click_url().to_string(),
            pointer: pointer.to_string(),
            client,
        }
    }
}

fn value_to_state(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Probe for JsonFieldProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn click_url(&self) -> &str {
        &self.click_url
    }

    async fn check(&self) -> Result<Observation> {
        let body: Value = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::probe(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::probe(format!("invalid JSON: {e}")))?;

        let value = body
            .pointer(&self.pointer)
            .ok_or_else(|| Error::probe(format!("no value at {}", self.pointer)))?;

        let state = value_to_state(value);

        Ok(Observation {
            detail: format!("{} = {state}", self.pointer),
            state,
        })
    }

    fn notification_content(
        &self,
        observation: &Observation,
        previous: Option<&str>,
    ) -> NotificationContent {
        let message = match previous {
            Some(prev) => format!("{} changed from {prev} to {}", self.pointer, observation.state),
            None => observation.detail.clone(),
        };

        NotificationContent {
            title: format!("{}: {}", self.name, observation.state),
            message,
            priority: PRIORITY_DEFAULT,
            tags: vec!["mag".to_string()],
        }
    }
}

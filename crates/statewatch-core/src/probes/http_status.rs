//! HTTP availability probe

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Observation, Probe};
use crate::config::TargetConfig;
use crate::error::{Error, Result};
use crate::models::{NotificationContent, PRIORITY_DEFAULT, PRIORITY_HIGH};

/// Reduces an HTTP endpoint to "up" or "down" by its response status
pub struct HttpStatusProbe {
    name: String,
    url: String,
    click_url: String,
    client: Client,
}

impl HttpStatusProbe {
    /// Create a probe from its target configuration
    pub fn new(target: &TargetConfig, client: Client) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            click_url: target.click_url().to_string(),
            client,
        }
    }
}

#[async_trait]
impl Probe for HttpStatusProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn click_url(&self) -> &str {
        &self.click_url
    }

    async fn check(&self) -> Result<Observation> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::probe(e.to_string()))?;

        let status = response.status();
        debug!(probe = %self.name, status = %status, "Availability check");

        let state = if status.is_success() { "up" } else { "down" };

        Ok(Observation {
            state: state.to_string(),
            detail: format!("HTTP {status}"),
        })
    }

    fn notification_content(
        &self,
        observation: &Observation,
        previous: Option<&str>,
    ) -> NotificationContent {
        let up = observation.state == "up";

        let message = match previous {
            Some(prev) if prev != observation.state => {
                format!("{} (was {prev})", observation.detail)
            }
            _ => observation.detail.clone(),
        };

        NotificationContent {
            title: format!("{} is {}", self.name, observation.state),
            message,
            priority: if up { PRIORITY_DEFAULT } else { PRIORITY_HIGH },
            tags: vec![if up { "white_check_mark" } else { "rotating_light" }.to_string()],
        }
    }
}

//! Page content probe

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use super::{Observation, Probe};
use crate::config::TargetConfig;
use crate::error::{Error, Result};
use crate::models::{NotificationContent, PRIORITY_DEFAULT, PRIORITY_HIGH};

/// Watches the first regex capture in a fetched page body
pub struct PageRegexProbe {
    name: String,
    url: String,
    click_url: String,
    pattern: Regex,
    client: Client,
}

impl PageRegexProbe {
    /// Create a probe from its target configuration. Fails on an invalid
    /// pattern.
    pub fn new(target: &TargetConfig, pattern: &str, client: Client) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::config(format!("target {}: bad pattern: {e}", target.name)))?;

        Ok(Self {
            name: target.name.clone(),
            url: target.url.clone(),
            click_url: target.click_url().to_string(),
            pattern,
            client,
        })
    }
}

#[async_trait]
impl Probe for PageRegexProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn click_url(&self) -> &str {
        &self.click_url
    }

    async fn check(&self) -> Result<Observation> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::probe(e.to_string()))?
            .text()
            .await
            .map_err(|e| Error::probe(e.to_string()))?;

        let captures = self
            .pattern
            .captures(&body)
            .ok_or_else(|| Error::probe(format!("pattern {} did not match", self.pattern)))?;

        // Capture group 1 when the pattern has one, whole match otherwise
        let state = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Ok(Observation {
            detail: format!("matched: {state}"),
            state,
        })
    }

    fn notification_content(
        &self,
        observation: &Observation,
        previous: Option<&str>,
    ) -> NotificationContent {
        let (message, priority) = match previous {
            Some(prev) if prev != observation.state => {
                (format!("Was: {prev}"), PRIORITY_HIGH)
            }
            _ => (observation.detail.clone(), PRIORITY_DEFAULT),
        };

        NotificationContent {
            title: format!("{}: {}", self.name, observation.state),
            message,
            priority,
            tags: vec!["eyes".to_string()],
        }
    }
}

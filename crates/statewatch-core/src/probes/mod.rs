//! Probe implementations
//!
//! A probe performs one observation of an external resource and reduces it to
//! an opaque state label. Probes also own the wording of content-state
//! notifications; the watcher core never formats those itself.

mod http_status;
mod json_field;
mod page_regex;

pub use http_status::HttpStatusProbe;
pub use json_field::JsonFieldProbe;
pub use page_regex::PageRegexProbe;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ProbeKind};
use crate::error::Result;
use crate::models::NotificationContent;

/// One successful observation of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Opaque state label; compared by exact equality
    pub state: String,
    /// Human-readable detail for notification bodies
    pub detail: String,
}

/// Capability contract of a monitored target
#[async_trait]
pub trait Probe: Send + Sync {
    /// Unique target name
    fn name(&self) -> &str;

    /// Click-through URL for notifications
    fn click_url(&self) -> &str;

    /// Perform one observation
    async fn check(&self) -> Result<Observation>;

    /// Wording for a content-state notification. Pure formatting, no I/O.
    fn notification_content(
        &self,
        observation: &Observation,
        previous: Option<&str>,
    ) -> NotificationContent;
}

/// Build the probe registry from configuration, skipping disabled targets
pub fn registry(config: &Config, client: &Client) -> Result<Vec<Box<dyn Probe>>> {
    let mut probes: Vec<Box<dyn Probe>> = Vec::new();

    for target in config.targets.iter().filter(|t| t.enabled) {
        let probe: Box<dyn Probe> = match &target.probe {
            ProbeKind::HttpStatus => Box::new(HttpStatusProbe::new(target, client.clone())),
            ProbeKind::JsonField { pointer } => {
                Box::new(JsonFieldProbe::new(target, pointer, client.clone()))
            }
            ProbeKind::PageRegex { pattern } => {
                Box::new(PageRegexProbe::new(target, pattern, client.clone())?)
            }
        };
        probes.push(probe);
    }

    Ok(probes)
}

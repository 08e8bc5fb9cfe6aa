//! Notification event models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum push priority (silent delivery)
pub const PRIORITY_MIN: u8 = 1;
/// Default push priority
pub const PRIORITY_DEFAULT: u8 = 3;
/// High push priority (vibrates/rings on most clients)
pub const PRIORITY_HIGH: u8 = 4;

/// What kind of event a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// First-ever observation of a target
    FirstObservation,
    /// Observed state differs from the last persisted state
    StateChanged,
    /// Observed state is unchanged (debug channel only)
    DebugPing,
    /// A failure streak crossed the alert threshold
    ErrorThreshold,
    /// A notified failure streak ended with a success
    Recovery,
}

/// Which configured topic a notification is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The main alert topic
    Primary,
    /// The optional debug topic
    Debug,
}

/// Probe-produced wording for a content-state notification
///
/// Pure formatting output; carries no transport or routing detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContent {
    /// Notification title
    pub title: String,
    /// Notification body
    pub message: String,
    /// Push priority (1..=5)
    pub priority: u8,
    /// Tag/emoji shortcodes
    pub tags: Vec<String>,
}

/// A fully-formed notification ready for delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Event kind that produced this notification
    pub kind: EventKind,
    /// Routing channel
    pub channel: Channel,
    /// Notification title
    pub title: String,
    /// Notification body
    pub message: String,
    /// Push priority (1..=5)
    pub priority: u8,
    /// Tag/emoji shortcodes
    pub tags: Vec<String>,
    /// Click-through URL
    pub click_url: String,
}

impl Notification {
    /// A content-state notification on the primary channel
    pub fn content(kind: EventKind, content: NotificationContent, click_url: &str) -> Self {
        Self {
            kind,
            channel: Channel::Primary,
            title: content.title,
            message: content.message,
            priority: content.priority,
            tags: content.tags,
            click_url: click_url.to_string(),
        }
    }

    /// An unchanged-state ping on the debug channel, delivered silently
    pub fn debug_ping(content: NotificationContent, click_url: &str) -> Self {
        Self {
            kind: EventKind::DebugPing,
            channel: Channel::Debug,
            title: content.title,
            message: content.message,
            priority: PRIORITY_MIN,
            tags: content.tags,
            click_url: click_url.to_string(),
        }
    }

    /// The one-time alert for a failure streak that crossed the threshold
    pub fn error_threshold(
        target: &str,
        failing_since: DateTime<Utc>,
        last_error: &str,
        click_url: &str,
    ) -> Self {
        Self {
            kind: EventKind::ErrorThreshold,
            channel: Channel::Primary,
            title: format!("{target} checks are failing"),
            message: format!(
                "Checks have been failing since {} UTC. Last error: {last_error}",
                failing_since.format("%Y-%m-%d %H:%M")
            ),
            priority: PRIORITY_HIGH,
            tags: vec!["warning".to_string()],
            click_url: click_url.to_string(),
        }
    }

    /// The one-time all-clear after a notified failure streak ends
    pub fn recovery(target: &str, click_url: &str) -> Self {
        Self {
            kind: EventKind::Recovery,
            channel: Channel::Primary,
            title: format!("{target} recovered"),
            message: "Checks are succeeding again.".to_string(),
            priority: PRIORITY_DEFAULT,
            tags: vec!["white_check_mark".to_string()],
            click_url: click_url.to_string(),
        }
    }
}

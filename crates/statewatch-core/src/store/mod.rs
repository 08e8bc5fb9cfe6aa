//! Persistence layer for statewatch
//!
//! Check history is append-only; failure streaks are a single live row per
//! target. The store is the single source of truth for "last state"; the
//! watcher never caches it.

mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgStateStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CheckRecord, ErrorStreak};

/// Per-target persistence operations
///
/// Every operation is scoped to one target and never observes or mutates
/// another target's rows. Timestamps are always supplied by the caller so the
/// clock stays an injected dependency.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// State of the most recent check record, if any exists
    async fn last_state(&self, target: &str) -> Result<Option<String>>;

    /// Append one check record
    async fn append_check(
        &self,
        target: &str,
        state: &str,
        notified: bool,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Most recent check records, newest first
    async fn recent_checks(&self, target: &str, limit: i64) -> Result<Vec<CheckRecord>>;

    /// The live failure streak, if one exists
    async fn streak(&self, target: &str) -> Result<Option<ErrorStreak>>;

    /// Open a failure streak starting at `at`
    async fn start_streak(&self, target: &str, at: DateTime<Utc>) -> Result<()>;

    /// Record that the threshold alert fired for the live streak
    async fn mark_streak_notified(&self, target: &str) -> Result<()>;

    /// Delete the live streak
    async fn clear_streak(&self, target: &str) -> Result<()>;

    /// Whether the live streak started at least `threshold_minutes` before
    /// `as_of`. False when no streak exists.
    async fn streak_overdue(
        &self,
        target: &str,
        as_of: DateTime<Utc>,
        threshold_minutes: i64,
    ) -> Result<bool>;
}

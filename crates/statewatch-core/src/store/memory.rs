//! In-memory state store used by orchestration tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::StateStore;
use crate::error::Result;
use crate::models::{CheckRecord, ErrorStreak};

#[derive(Default)]
struct Inner {
    checks: Vec<CheckRecord>,
    streaks: HashMap<String, ErrorStreak>,
    next_id: i64,
}

/// A `StateStore` holding everything in memory, with the same per-target
/// visibility rules as the real store
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All check records for a target, oldest first
    pub fn checks_for(&self, target: &str) -> Vec<CheckRecord> {
        let inner = self.inner.lock().unwrap();
        inner
            .checks
            .iter()
            .filter(|c| c.target == target)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn last_state(&self, target: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .checks
            .iter()
            .rev()
            .find(|c| c.target == target)
            .map(|c| c.state.clone()))
    }

    async fn append_check(
        &self,
        target: &str,
        state: &str,
        notified: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.checks.push(CheckRecord {
            id,
            target: target.to_string(),
            state: state.to_string(),
            checked_at: at,
            notified,
        });
        Ok(())
    }

    async fn recent_checks(&self, target: &str, limit: i64) -> Result<Vec<CheckRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .checks
            .iter()
            .rev()
            .filter(|c| c.target == target)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn streak(&self, target: &str) -> Result<Option<ErrorStreak>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.streaks.get(target).cloned())
    }

    async fn start_streak(&self, target: &str, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .streaks
            .entry(target.to_string())
            .or_insert_with(|| ErrorStreak {
                target: target.to_string(),
                started_at: at,
                notified: false,
            });
        Ok(())
    }

    async fn mark_streak_notified(&self, target: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(streak) = inner.streaks.get_mut(target) {
            streak.notified = true;
        }
        Ok(())
    }

    async fn clear_streak(&self, target: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.streaks.remove(target);
        Ok(())
    }

    async fn streak_overdue(
        &self,
        target: &str,
        as_of: DateTime<Utc>,
        threshold_minutes: i64,
    ) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .streaks
            .get(target)
            .map(|s| as_of - s.started_at >= Duration::minutes(threshold_minutes))
            .unwrap_or(false))
    }
}

//! Check history and failure-streak models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted observation of a target
///
/// Records are append-only; the most recent record for a target is its
/// "last state".
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckRecord {
    /// Insertion-ordered identifier
    pub id: i64,

    /// Target name
    pub target: String,

    /// Observed state label (opaque, target-specific)
    pub state: String,

    /// When the observation was made
    pub checked_at: DateTime<Utc>,

    /// Whether this record triggered an alert
    pub notified: bool,
}

/// Live failure-streak bookkeeping for a target
///
/// At most one row per target. Exists exactly while the target's most recent
/// probe attempt failed and no success has occurred since.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ErrorStreak {
    /// Target name
    pub target: String,

    /// When the first failure of this streak was observed
    pub started_at: DateTime<Utc>,

    /// Whether the threshold alert has already fired for this streak
    pub notified: bool,
}

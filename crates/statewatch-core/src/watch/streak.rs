//! Failure-streak state machine
//!
//! Tracks how long a target has been failing and whether that has already
//! been alerted. The decisions are pure; the store supplies the streak row
//! and the overdue comparison.

use crate::models::ErrorStreak;

/// Minutes a failure streak must persist before it becomes alert-worthy
pub const ERROR_THRESHOLD_MINUTES: i64 = 15;

/// Decision for a failed probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// First failure after a success: open a streak, no notification yet
    Start,
    /// Streak is open but younger than the threshold
    StillBelowThreshold,
    /// Streak crossed the threshold and has not been alerted yet
    ThresholdCrossed,
    /// Threshold alert already fired for this streak
    AlreadyNotified,
}

/// Decision for a successful probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// No streak was live
    None,
    /// A streak was live but never alerted: clear it silently
    ClearSilently,
    /// A notified streak ended: emit exactly one recovery alert, then clear
    Recovered,
}

/// Decide what a probe failure does to the streak state.
///
/// `overdue` is the store's answer to whether the streak is at least
/// [`ERROR_THRESHOLD_MINUTES`] old; it is ignored unless an un-notified
/// streak is live.
pub fn on_failure(streak: Option<&ErrorStreak>, overdue: bool) -> FailureAction {
    match streak {
        None => FailureAction::Start,
        Some(s) if s.notified => FailureAction::AlreadyNotified,
        Some(_) if overdue => FailureAction::ThresholdCrossed,
        Some(_) => FailureAction::StillBelowThreshold,
    }
}

/// Decide what a probe success does to the streak state
pub fn on_success(streak: Option<&ErrorStreak>) -> RecoveryAction {
    match streak {
        None => RecoveryAction::None,
        Some(s) if s.notified => RecoveryAction::Recovered,
        Some(_) => RecoveryAction::ClearSilently,
    }
}

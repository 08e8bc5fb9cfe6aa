//! Check orchestration and state-transition engine
//!
//! Two coupled state dimensions per target: content state (what the probe
//! observed) and failure state (how long checks have been failing). Each has
//! its own notify policy; the watcher sequences both against the store.

mod streak;
mod transition;
mod watcher;

pub use streak::{on_failure, on_success, FailureAction, RecoveryAction, ERROR_THRESHOLD_MINUTES};
pub use transition::{evaluate, Transition};
pub use watcher::{Clock, SystemClock, Watcher, PROBE_TIMEOUT_SECONDS};

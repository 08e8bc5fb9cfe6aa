//! Content-state transition evaluation

/// Outcome of comparing a new observation against the last persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No prior record exists for this target
    FirstObservation,
    /// Observed state equals the last persisted state
    Unchanged,
    /// Observed state differs from the last persisted state
    Changed,
}

/// Compare the current observation against the last persisted state.
///
/// Exact string equality; pure, no side effects.
pub fn evaluate(previous: Option<&str>, current: &str) -> Transition {
    match previous {
        None => Transition::FirstObservation,
        Some(prev) if prev == current => Transition::Unchanged,
        Some(_) => Transition::Changed,
    }
}

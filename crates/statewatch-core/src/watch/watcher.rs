//! Check orchestration

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::streak::{self, FailureAction, RecoveryAction, ERROR_THRESHOLD_MINUTES};
use super::transition::{self, Transition};
use crate::error::{Error, Result};
use crate::models::{EventKind, Notification};
use crate::notify::Dispatcher;
use crate::probes::{Observation, Probe};
use crate::store::StateStore;

/// Seconds before an in-flight probe check is cancelled and treated as failed
pub const PROBE_TIMEOUT_SECONDS: u64 = 10;

/// Time source injected into the watcher
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Drives one orchestration pass per scheduling tick over all enabled targets
pub struct Watcher {
    store: Arc<dyn StateStore>,
    dispatcher: Arc<dyn Dispatcher>,
    probes: Vec<Box<dyn Probe>>,
    clock: Arc<dyn Clock>,
    interval_seconds: u64,
    debug_channel: bool,
}

impl Watcher {
    /// Create a new watcher
    pub fn new(
        store: Arc<dyn StateStore>,
        dispatcher: Arc<dyn Dispatcher>,
        probes: Vec<Box<dyn Probe>>,
        clock: Arc<dyn Clock>,
        interval_seconds: u64,
        debug_channel: bool,
    ) -> Self {
        Self {
            store,
            dispatcher,
            probes,
            clock,
            interval_seconds,
            debug_channel,
        }
    }

    /// Start the scheduling loop
    pub async fn start(&self) {
        info!(
            targets = self.probes.len(),
            interval_seconds = self.interval_seconds,
            "Starting watcher"
        );

        let mut ticker = interval(Duration::from_secs(self.interval_seconds));
        // The pass is awaited before the next tick is polled, so passes never
        // overlap; a tick that would fire mid-pass is skipped, not queued.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.run_pass().await;
        }
    }

    /// Run one orchestration pass over all targets, sequentially.
    ///
    /// Per-target failures are contained here; no failure in one target's
    /// pipeline aborts another target or the scheduler.
    pub async fn run_pass(&self) {
        debug!(count = self.probes.len(), "Running check pass");

        for probe in &self.probes {
            if let Err(e) = self.check_target(probe.as_ref()).await {
                error!(probe = probe.name(), error = %e, "Check processing failed");
            }
        }
    }

    /// Process one target: probe, evaluate, notify, persist
    async fn check_target(&self, probe: &dyn Probe) -> Result<()> {
        let outcome = match timeout(Duration::from_secs(PROBE_TIMEOUT_SECONDS), probe.check()).await
        {
            Ok(result) => result,
            // Dropping the future cancels the in-flight request; the rest of
            // the pass continues.
            Err(_) => Err(Error::probe(format!(
                "check timed out after {PROBE_TIMEOUT_SECONDS}s"
            ))),
        };
        let now = self.clock.now();

        match outcome {
            Ok(observation) => self.handle_success(probe, &observation, now).await,
            Err(e) => {
                warn!(probe = probe.name(), error = %e, "Probe failed");
                self.handle_failure(probe, &e, now).await
            }
        }
    }

    async fn handle_success(
        &self,
        probe: &dyn Probe,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let target = probe.name();

        // Failure-streak dimension first: recovery is announced before any
        // content-state notification in the same pass.
        let streak_row = self.store.streak(target).await?;
        match streak::on_success(streak_row.as_ref()) {
            RecoveryAction::Recovered => {
                info!(probe = target, "Recovered after notified failure streak");
                self.dispatch(&Notification::recovery(target, probe.click_url()))
                    .await;
                // The streak ends with this success whether or not delivery
                // worked.
                self.store.clear_streak(target).await?;
            }
            RecoveryAction::ClearSilently => self.store.clear_streak(target).await?,
            RecoveryAction::None => {}
        }

        let previous = self.store.last_state(target).await?;
        let transition = transition::evaluate(previous.as_deref(), &observation.state);

        debug!(
            probe = target,
            state = %observation.state,
            previous = ?previous,
            transition = ?transition,
            "Evaluated check"
        );

        let notified = match transition {
            Transition::FirstObservation | Transition::Changed => {
                let kind = if transition == Transition::FirstObservation {
                    EventKind::FirstObservation
                } else {
                    EventKind::StateChanged
                };
                let content = probe.notification_content(observation, previous.as_deref());
                self.dispatch(&Notification::content(kind, content, probe.click_url()))
                    .await;
                true
            }
            Transition::Unchanged => {
                if self.debug_channel {
                    let content = probe.notification_content(observation, previous.as_deref());
                    self.dispatch(&Notification::debug_ping(content, probe.click_url()))
                        .await;
                }
                false
            }
        };

        self.store
            .append_check(target, &observation.state, notified, now)
            .await
    }

    async fn handle_failure(
        &self,
        probe: &dyn Probe,
        probe_error: &Error,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let target = probe.name();

        let streak_row = self.store.streak(target).await?;
        let overdue = match streak_row.as_ref() {
            Some(s) if !s.notified => {
                self.store
                    .streak_overdue(target, now, ERROR_THRESHOLD_MINUTES)
                    .await?
            }
            _ => false,
        };

        match streak::on_failure(streak_row.as_ref(), overdue) {
            FailureAction::Start => {
                debug!(probe = target, "Opening failure streak");
                self.store.start_streak(target, now).await?;
            }
            FailureAction::StillBelowThreshold | FailureAction::AlreadyNotified => {}
            FailureAction::ThresholdCrossed => {
                // ThresholdCrossed implies a live streak row
                let started_at = streak_row.map(|s| s.started_at).unwrap_or(now);
                let notification = Notification::error_threshold(
                    target,
                    started_at,
                    &probe_error.to_string(),
                    probe.click_url(),
                );
                // A failed delivery leaves the streak un-marked; the next
                // tick retries.
                if self.dispatch(&notification).await {
                    self.store.mark_streak_notified(target).await?;
                }
            }
        }

        Ok(())
    }

    /// Attempt delivery; a dispatch failure is logged, never propagated
    async fn dispatch(&self, notification: &Notification) -> bool {
        match self.dispatcher.send(notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(kind = ?notification.kind, error = %e, "Notification delivery failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, NotificationContent, PRIORITY_MIN};
    use crate::notify::NotifyError;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            }
        }

        fn advance_minutes(&self, minutes: i64) {
            let mut now = self.now.lock().unwrap();
            *now += ChronoDuration::minutes(minutes);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<Notification>>,
        failing: AtomicBool,
    }

    impl RecordingDispatcher {
        fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }

        fn kinds(&self) -> Vec<EventKind> {
            self.sent().iter().map(|n| n.kind).collect()
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn send(
            &self,
            notification: &Notification,
        ) -> std::result::Result<(), NotifyError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifyError::Http("delivery refused".to_string()));
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    /// Probe returning a pre-scripted sequence of outcomes, one per pass
    struct ScriptedProbe {
        name: String,
        script: Mutex<VecDeque<std::result::Result<String, String>>>,
    }

    impl ScriptedProbe {
        fn new(name: &str, script: Vec<std::result::Result<&str, &str>>) -> Self {
            Self {
                name: name.to_string(),
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait::async_trait]
    impl Probe for ScriptedProbe {
        fn name(&self) -> &str {
            &self.name
        }

        fn click_url(&self) -> &str {
            "https://example.com"
        }

        async fn check(&self) -> Result<Observation> {
            match self.script.lock().unwrap().pop_front().expect("script exhausted") {
                Ok(state) => Ok(Observation {
                    detail: format!("state {state}"),
                    state,
                }),
                Err(message) => Err(Error::Probe(message)),
            }
        }

        fn notification_content(
            &self,
            observation: &Observation,
            previous: Option<&str>,
        ) -> NotificationContent {
            NotificationContent {
                title: format!("{}: {}", self.name, observation.state),
                message: previous
                    .map(|p| format!("was {p}"))
                    .unwrap_or_else(|| "first observation".to_string()),
                priority: 3,
                tags: vec![],
            }
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        dispatcher: Arc<RecordingDispatcher>,
        clock: Arc<ManualClock>,
        watcher: Watcher,
    }

    fn harness(probes: Vec<Box<dyn Probe>>, debug_channel: bool) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let clock = Arc::new(ManualClock::new());
        let watcher = Watcher::new(
            store.clone(),
            dispatcher.clone(),
            probes,
            clock.clone(),
            60,
            debug_channel,
        );
        Harness {
            store,
            dispatcher,
            clock,
            watcher,
        }
    }

    fn scripted(script: Vec<std::result::Result<&str, &str>>) -> Vec<Box<dyn Probe>> {
        vec![Box::new(ScriptedProbe::new("x", script))]
    }

    #[tokio::test]
    async fn test_first_check_always_notifies() {
        let h = harness(scripted(vec![Ok("A")]), false);

        h.watcher.run_pass().await;

        assert_eq!(h.dispatcher.kinds(), vec![EventKind::FirstObservation]);
        let checks = h.store.checks_for("x");
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].state, "A");
        assert!(checks[0].notified);
    }

    #[tokio::test]
    async fn test_unchanged_without_debug_channel_is_silent() {
        let h = harness(scripted(vec![Ok("A"), Ok("A")]), false);

        h.watcher.run_pass().await;
        h.watcher.run_pass().await;

        assert_eq!(h.dispatcher.kinds(), vec![EventKind::FirstObservation]);
        let checks = h.store.checks_for("x");
        assert_eq!(checks.len(), 2);
        assert!(!checks[1].notified);
    }

    #[tokio::test]
    async fn test_unchanged_with_debug_channel_pings() {
        let h = harness(scripted(vec![Ok("A"), Ok("A")]), true);

        h.watcher.run_pass().await;
        h.watcher.run_pass().await;

        let sent = h.dispatcher.sent();
        assert_eq!(
            h.dispatcher.kinds(),
            vec![EventKind::FirstObservation, EventKind::DebugPing]
        );
        assert_eq!(sent[1].channel, Channel::Debug);
        assert_eq!(sent[1].priority, PRIORITY_MIN);
        // the debug ping still persists an un-notified record
        assert!(!h.store.checks_for("x")[1].notified);
    }

    #[tokio::test]
    async fn test_changed_state_notifies() {
        let h = harness(scripted(vec![Ok("A"), Ok("B")]), false);

        h.watcher.run_pass().await;
        h.watcher.run_pass().await;

        assert_eq!(
            h.dispatcher.kinds(),
            vec![EventKind::FirstObservation, EventKind::StateChanged]
        );
        let sent = h.dispatcher.sent();
        assert_eq!(sent[1].message, "was A");
        let checks = h.store.checks_for("x");
        assert_eq!(checks[1].state, "B");
        assert!(checks[1].notified);
    }

    #[tokio::test]
    async fn test_threshold_fires_exactly_once_at_fifteen_minutes() {
        let h = harness(scripted(vec![Err("connection refused"); 17]), false);

        // minutes 0..=14: streak is open but below the threshold
        for _ in 0..15 {
            h.watcher.run_pass().await;
            h.clock.advance_minutes(1);
        }
        assert!(h.dispatcher.sent().is_empty());
        let streak = h.store.streak("x").await.unwrap().unwrap();
        assert!(!streak.notified);

        // minute 15: now - started_at reaches the threshold
        h.watcher.run_pass().await;
        assert_eq!(h.dispatcher.kinds(), vec![EventKind::ErrorThreshold]);
        assert!(h.store.streak("x").await.unwrap().unwrap().notified);

        // minute 16: already alerted, no repeat
        h.clock.advance_minutes(1);
        h.watcher.run_pass().await;
        assert_eq!(h.dispatcher.kinds(), vec![EventKind::ErrorThreshold]);

        // failures never append check records
        assert!(h.store.checks_for("x").is_empty());
    }

    #[tokio::test]
    async fn test_recovery_after_notified_streak() {
        let mut script = vec![Err("connection refused"); 16];
        script.push(Ok("A"));
        let h = harness(scripted(script), false);

        for _ in 0..16 {
            h.watcher.run_pass().await;
            h.clock.advance_minutes(1);
        }
        assert_eq!(h.dispatcher.kinds(), vec![EventKind::ErrorThreshold]);

        // success at minute 16: recovery first, then normal evaluation
        h.watcher.run_pass().await;

        assert_eq!(
            h.dispatcher.kinds(),
            vec![
                EventKind::ErrorThreshold,
                EventKind::Recovery,
                EventKind::FirstObservation,
            ]
        );
        assert!(h.store.streak("x").await.unwrap().is_none());
        let checks = h.store.checks_for("x");
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].state, "A");
        assert!(checks[0].notified);
    }

    #[tokio::test]
    async fn test_recovery_after_quiet_streak_is_silent() {
        let h = harness(scripted(vec![Err("timeout"), Ok("A")]), false);

        h.watcher.run_pass().await;
        h.clock.advance_minutes(1);
        h.watcher.run_pass().await;

        // the streak clears without a Recovery event
        assert_eq!(h.dispatcher.kinds(), vec![EventKind::FirstObservation]);
        assert!(h.store.streak("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_threshold_dispatch_failure_retries_next_tick() {
        let h = harness(scripted(vec![Err("refused"); 3]), false);

        h.watcher.run_pass().await;
        h.clock.advance_minutes(16);

        h.dispatcher.set_failing(true);
        h.watcher.run_pass().await;
        // delivery failed: the streak stays un-marked
        assert!(h.dispatcher.sent().is_empty());
        assert!(!h.store.streak("x").await.unwrap().unwrap().notified);

        h.dispatcher.set_failing(false);
        h.clock.advance_minutes(1);
        h.watcher.run_pass().await;
        assert_eq!(h.dispatcher.kinds(), vec![EventKind::ErrorThreshold]);
        assert!(h.store.streak("x").await.unwrap().unwrap().notified);
    }

    #[tokio::test]
    async fn test_content_dispatch_failure_still_persists_check() {
        let h = harness(scripted(vec![Ok("A")]), false);
        h.dispatcher.set_failing(true);

        h.watcher.run_pass().await;

        // the notified flag reflects which branch fired, not delivery
        let checks = h.store.checks_for("x");
        assert_eq!(checks.len(), 1);
        assert!(checks[0].notified);
    }

    #[tokio::test]
    async fn test_recovery_dispatch_failure_still_clears_streak() {
        let mut script = vec![Err("refused"); 2];
        script.push(Ok("A"));
        let h = harness(scripted(script), false);

        h.watcher.run_pass().await;
        h.clock.advance_minutes(16);
        h.watcher.run_pass().await;
        assert_eq!(h.dispatcher.kinds(), vec![EventKind::ErrorThreshold]);

        h.dispatcher.set_failing(true);
        h.clock.advance_minutes(1);
        h.watcher.run_pass().await;

        assert!(h.store.streak("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_target_does_not_block_others() {
        let probes: Vec<Box<dyn Probe>> = vec![
            Box::new(ScriptedProbe::new("a", vec![Err("refused")])),
            Box::new(ScriptedProbe::new("b", vec![Ok("B")])),
        ];
        let h = harness(probes, false);

        h.watcher.run_pass().await;

        assert_eq!(h.dispatcher.kinds(), vec![EventKind::FirstObservation]);
        assert_eq!(h.store.checks_for("b").len(), 1);
        assert!(h.store.streak("a").await.unwrap().is_some());
        assert!(h.store.streak("b").await.unwrap().is_none());
    }
}

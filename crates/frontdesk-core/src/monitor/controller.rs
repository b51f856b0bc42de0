//! The session state machine.
//!
//! ```text
//!   (no session) ──begin──▶ Active ──remaining ≤ window──▶ Warning
//!                             ▲                              │
//!                             └────activity / stay──────────┘
//!   Active | Warning ──remaining = 0 | rejection | logout──▶ (no session)
//! ```
//!
//! Every way out of a session (expiry, a rejected or unreachable credential,
//! manual logout, a logout in another front-desk process) goes through
//! `teardown`, which is a guarded no-op once the session is gone. A second
//! tick, a late rejection or a stray key press after teardown therefore
//! produces no further side effects.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{CredentialSlot, Identity, Rejection, RejectionCause};
use crate::auth::{Session, SessionData};
use crate::storage::{read_last_activity, write_last_activity, KeyValueStore, CREDENTIAL_KEY};

use super::activity::{ActivityKind, ActivityRecorder};
use super::clock::Clock;
use super::phase::{Evaluation, SessionClock, SessionPhase, SessionTimings};

/// Best-effort server notification that a credential is no longer in use.
///
/// Implementations must return immediately; the notification is never
/// awaited or retried.
pub trait LogoutNotifier: Send + Sync {
    fn notify_logout(&self, credential: String);
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Inactivity reached the timeout.
    Expired,
    /// A credentialed call came back 401.
    Rejected,
    /// A credentialed call could not reach the server.
    Unreachable,
    /// The user logged out.
    LoggedOut,
}

impl EndReason {
    pub fn is_forced(&self) -> bool {
        !matches!(self, EndReason::LoggedOut)
    }
}

/// How a session came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Fresh credential from a login form.
    Login,
    /// Persisted credential verified at start-up.
    Restored,
}

/// Visible side effects, delivered to the host in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started(Identity),
    WarningShown { seconds: u64 },
    Countdown { seconds: u64 },
    WarningCleared,
    /// The session is gone. The host must discard all in-memory state and
    /// return to its unauthenticated entry point.
    Ended(EndReason),
}

pub struct SessionController {
    session: Session,
    phase: SessionPhase,
    shown_seconds: u64,
    generation: u64,
    /// Stand-in for a missing activity record
    started_ms: i64,
    /// Set once the credential was seen in the store; its later removal
    /// means another process ended the login
    watch_credential: bool,
    store: Arc<dyn KeyValueStore>,
    wall: Arc<dyn Clock>,
    clock: SessionClock,
    recorder: ActivityRecorder,
    credential: CredentialSlot,
    notifier: Arc<dyn LogoutNotifier>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        wall: Arc<dyn Clock>,
        timings: SessionTimings,
        credential: CredentialSlot,
        notifier: Arc<dyn LogoutNotifier>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            session: Session::new(Arc::clone(&store)),
            phase: SessionPhase::Active,
            shown_seconds: 0,
            generation: 0,
            started_ms: 0,
            watch_credential: false,
            clock: SessionClock::new(Arc::clone(&store), Arc::clone(&wall), timings),
            recorder: ActivityRecorder::new(Arc::clone(&store), Arc::clone(&wall)),
            store,
            wall,
            credential,
            notifier,
            events,
        }
    }

    /// Current phase, or `None` when there is no session.
    pub fn phase(&self) -> Option<SessionPhase> {
        self.session.is_active().then_some(self.phase)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.identity()
    }

    pub fn timings(&self) -> &SessionTimings {
        self.clock.timings()
    }

    /// Increments every time a session begins. Timers armed for an older
    /// generation must be replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn emit(&self, event: SessionEvent) {
        // The host may have gone away; nothing to do about it here
        let _ = self.events.send(event);
    }

    fn set_credential(&self, credential: Option<String>) {
        *self.credential.write().unwrap_or_else(|e| e.into_inner()) = credential;
    }

    /// Start a session. Any session already held is logged out first.
    pub fn begin(&mut self, data: SessionData, origin: SessionOrigin) {
        if self.session.is_active() {
            self.end(EndReason::LoggedOut);
        }

        let identity = data.identity.clone();
        let credential = data.credential.clone();
        self.set_credential(Some(credential.clone()));
        self.session.update(data);
        let now = self.wall.now_ms();
        self.started_ms = now;

        if origin == SessionOrigin::Login {
            if let Err(e) = self.session.save() {
                warn!(error = %e, "Failed to persist credential");
            }
        }
        if origin == SessionOrigin::Login || read_last_activity(self.store.as_ref()).is_none() {
            if let Err(e) = write_last_activity(self.store.as_ref(), now) {
                warn!(error = %e, "Failed to stamp session activity");
            }
        }
        self.watch_credential = matches!(
            self.store.get(CREDENTIAL_KEY),
            Ok(Some(ref stored)) if *stored == credential
        );

        self.recorder.arm();
        self.phase = SessionPhase::Active;
        self.generation += 1;
        info!(username = %identity.username, role = %identity.role, ?origin, "Session started");
        self.emit(SessionEvent::Started(identity));

        // A restored session may already be inside the warning window
        self.evaluate();
    }

    /// Periodic or countdown evaluation.
    pub fn evaluate(&mut self) {
        if !self.session.is_active() {
            return;
        }
        if self.credential_revoked() {
            self.end_revoked();
            return;
        }
        let evaluation = self.clock.evaluate(self.started_ms);
        self.apply(evaluation);
    }

    /// True if the persisted credential is no longer the one this session holds.
    fn credential_revoked(&self) -> bool {
        if !self.watch_credential {
            return false;
        }
        match self.store.get(CREDENTIAL_KEY) {
            Ok(stored) => stored.as_deref() != self.session.token(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                false
            }
        }
    }

    /// Another process logged out (or in as someone else). Its storage is
    /// left as found.
    fn end_revoked(&mut self) {
        info!("Persisted credential removed elsewhere");
        self.teardown(EndReason::LoggedOut, false);
    }

    fn apply(&mut self, evaluation: Evaluation) {
        match (self.phase, evaluation.phase) {
            (_, SessionPhase::Expired) => {
                self.end(EndReason::Expired);
            }
            (SessionPhase::Active, SessionPhase::Warning) => {
                self.phase = SessionPhase::Warning;
                let seconds = evaluation.countdown_secs();
                self.shown_seconds = seconds;
                info!(seconds, "Inactivity warning shown");
                self.emit(SessionEvent::WarningShown { seconds });
            }
            (SessionPhase::Warning, SessionPhase::Warning) => {
                // The tick and the countdown can land in the same second
                let seconds = evaluation.countdown_secs();
                if seconds != self.shown_seconds {
                    self.shown_seconds = seconds;
                    self.emit(SessionEvent::Countdown { seconds });
                }
            }
            (SessionPhase::Warning, SessionPhase::Active) => {
                self.phase = SessionPhase::Active;
                info!("Inactivity warning cleared");
                self.emit(SessionEvent::WarningCleared);
            }
            (_, SessionPhase::Active) => {
                debug!(
                    remaining_secs = evaluation.remaining.as_secs(),
                    "Session active"
                );
            }
            (SessionPhase::Expired, SessionPhase::Warning) => {}
        }
    }

    /// Returns true if the session is still alive and activity may extend it.
    ///
    /// Input arriving after the timeout already elapsed (the process was
    /// suspended past it) must not revive the session.
    fn still_alive(&mut self) -> bool {
        if !self.session.is_active() {
            return false;
        }
        if self.credential_revoked() {
            self.end_revoked();
            return false;
        }
        if self.clock.evaluate(self.started_ms).phase == SessionPhase::Expired {
            self.end(EndReason::Expired);
            return false;
        }
        true
    }

    /// An interaction event from the activity source.
    pub fn on_activity(&mut self, kind: ActivityKind) {
        if !kind.is_qualifying() || !self.still_alive() {
            return;
        }
        self.recorder.record(kind);
        self.evaluate();
    }

    /// The "stay logged in" acknowledgement on the warning.
    pub fn stay_logged_in(&mut self) {
        if !self.still_alive() {
            return;
        }
        self.recorder.register_activity();
        self.evaluate();
    }

    /// A credentialed call failed closed.
    ///
    /// Only a rejection of the credential this session holds counts; a late
    /// answer to a call made under an earlier login is dropped.
    pub fn on_rejection(&mut self, rejection: &Rejection) {
        if self.session.token() != Some(rejection.credential.as_str()) {
            debug!(path = %rejection.path, "Rejection for no current session; ignoring");
            return;
        }
        let reason = match rejection.cause {
            RejectionCause::Unauthorized => EndReason::Rejected,
            RejectionCause::Unreachable => EndReason::Unreachable,
        };
        warn!(path = %rejection.path, ?reason, "Credential no longer trusted");
        self.end(reason);
    }

    /// Manual logout. Local state is always cleared, session or not.
    pub fn logout(&mut self) {
        if !self.end(EndReason::LoggedOut) {
            self.set_credential(None);
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "Failed to clear stored session");
            }
        }
    }

    /// Tear the session down. Returns false if there was nothing to end.
    fn end(&mut self, reason: EndReason) -> bool {
        self.teardown(reason, true)
    }

    fn teardown(&mut self, reason: EndReason, clear_storage: bool) -> bool {
        let Some(data) = self.session.take() else {
            return false;
        };

        self.recorder.disarm();
        self.set_credential(None);
        self.watch_credential = false;
        if clear_storage {
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "Failed to clear stored session");
            }
        }
        self.phase = SessionPhase::Expired;

        if reason.is_forced() {
            info!(username = %data.username(), ?reason, "Session forcibly ended");
        } else {
            info!(username = %data.username(), "Logged out");
        }

        self.notifier.notify_logout(data.credential);
        self.emit(SessionEvent::Ended(reason));
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, RwLock};
    use std::time::Duration;

    use super::*;
    use crate::api::Role;
    use crate::monitor::clock::ManualClock;
    use crate::storage::{clear_session, MemoryStore, LAST_ACTIVITY_KEY};

    const T0: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<String>>,
    }

    impl LogoutNotifier for RecordingNotifier {
        fn notify_logout(&self, credential: String) {
            self.calls.lock().unwrap().push(credential);
        }
    }

    struct Harness {
        controller: SessionController,
        clock: ManualClock,
        store: Arc<MemoryStore>,
        slot: CredentialSlot,
        notifier: Arc<RecordingNotifier>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = ManualClock::new(T0);
            let store = Arc::new(MemoryStore::new());
            let slot: CredentialSlot = Arc::new(RwLock::new(None));
            let notifier = Arc::new(RecordingNotifier::default());
            let (tx, rx) = mpsc::unbounded_channel();
            let controller = SessionController::new(
                store.clone(),
                Arc::new(clock.clone()),
                SessionTimings::default(),
                slot.clone(),
                notifier.clone(),
                tx,
            );
            Self {
                controller,
                clock,
                store,
                slot,
                notifier,
                events: rx,
            }
        }

        fn login(&mut self) {
            self.controller.begin(session_data(), SessionOrigin::Login);
        }

        fn drain(&mut self) -> Vec<SessionEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }

        fn advance_to(&mut self, secs: u64) {
            self.clock.set(T0 + (secs as i64) * 1000);
        }

        fn logout_calls(&self) -> usize {
            self.notifier.calls.lock().unwrap().len()
        }
    }

    fn session_data() -> SessionData {
        SessionData::new(
            "tok-1".into(),
            Identity {
                username: "ANNA".into(),
                role: Role::Staff,
            },
        )
    }

    // -------------------------------------------------------------------------
    // Begin
    // -------------------------------------------------------------------------

    #[test]
    fn test_login_persists_and_stamps_activity() {
        let mut h = Harness::new();
        h.login();

        assert_eq!(h.controller.phase(), Some(SessionPhase::Active));
        assert_eq!(h.store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("tok-1"));
        assert_eq!(read_last_activity(h.store.as_ref()), Some(T0));
        assert_eq!(h.slot.read().unwrap().as_deref(), Some("tok-1"));
        assert_eq!(h.controller.generation(), 1);
        assert!(matches!(h.drain().as_slice(), [SessionEvent::Started(_)]));
    }

    #[test]
    fn test_restored_session_keeps_activity_record() {
        let mut h = Harness::new();
        write_last_activity(h.store.as_ref(), T0 - 280_000).unwrap();
        h.controller.begin(session_data(), SessionOrigin::Restored);

        assert_eq!(read_last_activity(h.store.as_ref()), Some(T0 - 280_000));
        // Already inside the warning window
        assert_eq!(h.controller.phase(), Some(SessionPhase::Warning));
        let events = h.drain();
        assert_eq!(events[1], SessionEvent::WarningShown { seconds: 20 });
    }

    #[test]
    fn test_restored_session_without_record_starts_clock_at_begin() {
        let mut h = Harness::new();
        h.controller.begin(session_data(), SessionOrigin::Restored);
        assert_eq!(read_last_activity(h.store.as_ref()), Some(T0));

        h.advance_to(3600);
        h.controller.evaluate();

        assert_eq!(h.controller.phase(), None);
        assert_eq!(h.drain().last(), Some(&SessionEvent::Ended(EndReason::Expired)));
        assert_eq!(h.logout_calls(), 1);
    }

    #[test]
    fn test_missing_record_counts_from_session_start() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(100);
        h.store.remove(LAST_ACTIVITY_KEY).unwrap();

        h.advance_to(299);
        h.controller.evaluate();
        assert_eq!(h.controller.phase(), Some(SessionPhase::Warning));

        h.advance_to(300);
        h.controller.evaluate();
        assert_eq!(h.controller.phase(), None);
        assert_eq!(h.drain().last(), Some(&SessionEvent::Ended(EndReason::Expired)));
    }

    // -------------------------------------------------------------------------
    // Phase ladder
    // -------------------------------------------------------------------------

    #[test]
    fn test_reference_timeline() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        for t in (5..270).step_by(5) {
            h.advance_to(t);
            h.controller.evaluate();
        }
        assert_eq!(h.controller.phase(), Some(SessionPhase::Active));
        assert!(h.drain().is_empty());

        h.advance_to(270);
        h.controller.evaluate();
        assert_eq!(h.drain(), vec![SessionEvent::WarningShown { seconds: 30 }]);

        h.advance_to(285);
        h.controller.evaluate();
        assert_eq!(h.drain(), vec![SessionEvent::Countdown { seconds: 15 }]);

        h.advance_to(300);
        h.controller.evaluate();
        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::Expired)]);
        assert_eq!(h.controller.phase(), None);
        assert_eq!(h.logout_calls(), 1);
        assert_eq!(h.store.get(CREDENTIAL_KEY).unwrap(), None);
        assert_eq!(read_last_activity(h.store.as_ref()), None);
        assert_eq!(*h.slot.read().unwrap(), None);

        // Later ticks against the cleared session do nothing
        h.advance_to(305);
        h.controller.evaluate();
        h.controller.evaluate();
        assert!(h.drain().is_empty());
        assert_eq!(h.logout_calls(), 1);
    }

    #[test]
    fn test_same_second_evaluations_redraw_once() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(270);
        h.controller.evaluate();
        h.drain();

        h.advance_to(275);
        h.controller.evaluate();
        h.controller.evaluate();
        assert_eq!(h.drain(), vec![SessionEvent::Countdown { seconds: 25 }]);
    }

    #[test]
    fn test_regular_activity_stays_active() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        for minute in 1..=60 {
            h.advance_to(minute * 260);
            h.controller.on_activity(ActivityKind::KeyPress);
            h.controller.evaluate();
        }
        assert_eq!(h.controller.phase(), Some(SessionPhase::Active));
        assert!(h.drain().is_empty());
    }

    #[test]
    fn test_long_gap_expires_without_warning() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        h.clock.advance(Duration::from_secs(3600));
        h.controller.evaluate();
        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::Expired)]);
    }

    // -------------------------------------------------------------------------
    // Activity
    // -------------------------------------------------------------------------

    #[test]
    fn test_activity_during_warning_returns_to_active() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(275);
        h.controller.evaluate();
        h.drain();

        h.advance_to(280);
        h.controller.on_activity(ActivityKind::PointerPress);

        assert_eq!(h.controller.phase(), Some(SessionPhase::Active));
        assert_eq!(h.drain(), vec![SessionEvent::WarningCleared]);
        assert_eq!(read_last_activity(h.store.as_ref()), Some(T0 + 280_000));
    }

    #[test]
    fn test_movement_does_not_clear_warning() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(275);
        h.controller.evaluate();
        h.drain();

        h.controller.on_activity(ActivityKind::PointerMove);
        h.controller.on_activity(ActivityKind::Scroll);

        assert_eq!(h.controller.phase(), Some(SessionPhase::Warning));
        assert!(h.drain().is_empty());
    }

    #[test]
    fn test_stay_logged_in_acknowledgement() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(290);
        h.controller.evaluate();
        h.drain();

        h.controller.stay_logged_in();

        assert_eq!(h.controller.phase(), Some(SessionPhase::Active));
        assert_eq!(h.drain(), vec![SessionEvent::WarningCleared]);
    }

    #[test]
    fn test_activity_after_timeout_does_not_revive() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        // Suspended past the timeout; the first thing seen on resume is a key
        h.advance_to(400);
        h.controller.on_activity(ActivityKind::KeyPress);

        assert_eq!(h.controller.phase(), None);
        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::Expired)]);
        assert_eq!(read_last_activity(h.store.as_ref()), None);
    }

    #[test]
    fn test_activity_in_another_context_clears_warning() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(275);
        h.controller.evaluate();
        h.drain();

        // Another window on the same device recorded a key press
        write_last_activity(h.store.as_ref(), T0 + 274_000).unwrap();
        h.advance_to(280);
        h.controller.evaluate();

        assert_eq!(h.drain(), vec![SessionEvent::WarningCleared]);
    }

    #[test]
    fn test_stray_activity_after_teardown_is_noop() {
        let mut h = Harness::new();
        h.login();
        h.controller.logout();
        h.drain();

        h.controller.on_activity(ActivityKind::KeyPress);
        h.controller.stay_logged_in();

        assert!(h.drain().is_empty());
        assert_eq!(read_last_activity(h.store.as_ref()), None);
    }

    // -------------------------------------------------------------------------
    // Rejection and logout
    // -------------------------------------------------------------------------

    #[test]
    fn test_rejection_ends_session_immediately() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(10);
        h.drain();

        h.controller.on_rejection(&Rejection {
            cause: RejectionCause::Unauthorized,
            path: "/patients".into(),
            credential: "tok-1".into(),
        });

        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::Rejected)]);
        assert_eq!(h.store.get(CREDENTIAL_KEY).unwrap(), None);

        // A second rejection from a concurrent call is ignored
        h.controller.on_rejection(&Rejection {
            cause: RejectionCause::Unauthorized,
            path: "/queue".into(),
            credential: "tok-1".into(),
        });
        assert!(h.drain().is_empty());
        assert_eq!(h.logout_calls(), 1);
    }

    #[test]
    fn test_unreachable_server_fails_closed() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        h.controller.on_rejection(&Rejection {
            cause: RejectionCause::Unreachable,
            path: "/dashboard".into(),
            credential: "tok-1".into(),
        });

        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::Unreachable)]);
    }

    #[test]
    fn test_rejection_for_previous_credential_is_ignored() {
        let mut h = Harness::new();
        h.login();
        h.controller.logout();
        let mut next = session_data();
        next.credential = "tok-2".into();
        h.controller.begin(next, SessionOrigin::Login);
        h.drain();

        // A call made under tok-1 answers after tok-2 took over
        h.controller.on_rejection(&Rejection {
            cause: RejectionCause::Unauthorized,
            path: "/dashboard".into(),
            credential: "tok-1".into(),
        });

        assert!(h.drain().is_empty());
        assert_eq!(h.controller.phase(), Some(SessionPhase::Active));
        assert_eq!(h.slot.read().unwrap().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_logout_in_another_process_ends_session() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        clear_session(h.store.as_ref()).unwrap();
        h.advance_to(10);
        h.controller.evaluate();

        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::LoggedOut)]);
        assert_eq!(h.controller.phase(), None);
        assert_eq!(h.slot.read().unwrap().as_deref(), None);
    }

    #[test]
    fn test_login_elsewhere_ends_session_and_keeps_new_credential() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        h.store.set(CREDENTIAL_KEY, "tok-9").unwrap();
        h.advance_to(10);
        h.controller.on_activity(ActivityKind::KeyPress);

        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::LoggedOut)]);
        assert_eq!(h.store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("tok-9"));
    }

    #[test]
    fn test_manual_logout_from_warning() {
        let mut h = Harness::new();
        h.login();
        h.advance_to(280);
        h.controller.evaluate();
        h.drain();

        h.controller.logout();

        assert_eq!(h.drain(), vec![SessionEvent::Ended(EndReason::LoggedOut)]);
        assert_eq!(h.notifier.calls.lock().unwrap().as_slice(), ["tok-1".to_string()]);
        assert_eq!(h.controller.phase(), None);
    }

    #[test]
    fn test_logout_without_session_still_clears_storage() {
        let mut h = Harness::new();
        h.store.set(CREDENTIAL_KEY, "stale").unwrap();
        write_last_activity(h.store.as_ref(), 1).unwrap();

        h.controller.logout();

        assert_eq!(h.store.get(CREDENTIAL_KEY).unwrap(), None);
        assert_eq!(read_last_activity(h.store.as_ref()), None);
        assert!(h.drain().is_empty());
        assert_eq!(h.logout_calls(), 0);
    }

    #[test]
    fn test_login_over_existing_session_ends_it_first() {
        let mut h = Harness::new();
        h.login();
        h.drain();

        h.login();

        let events = h.drain();
        assert_eq!(events[0], SessionEvent::Ended(EndReason::LoggedOut));
        assert!(matches!(events[1], SessionEvent::Started(_)));
        assert_eq!(h.controller.generation(), 2);
        assert_eq!(h.controller.phase(), Some(SessionPhase::Active));
    }
}

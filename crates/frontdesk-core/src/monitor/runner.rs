//! The session monitor event loop.
//!
//! One task owns the `SessionController` and multiplexes everything that can
//! move it: host commands, activity events, rejections reported by the API
//! client, the periodic evaluator and (while the warning is up) the countdown
//! redraw. Each input is handled to completion before the next is polled, so
//! the controller never sees interleaved calls.
//!
//! ```ignore
//! let (monitor, handle, mut events) = SessionMonitor::new(api, store, clock, Box::new(source));
//! tokio::spawn(monitor.run());
//! handle.login("anna", "secret").await?;
//! while let Some(event) = events.recv().await { /* update UI */ }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, Identity, LoginError, Rejection};
use crate::auth::SessionData;
use crate::storage::{clear_session, KeyValueStore};

use super::activity::{ActivityKind, ActivitySource};
use super::clock::Clock;
use super::controller::{LogoutNotifier, SessionController, SessionEvent, SessionOrigin};
use super::phase::{SessionPhase, SessionTimings};

enum Command {
    Begin {
        data: SessionData,
        origin: SessionOrigin,
        ack: oneshot::Sender<()>,
    },
    StayLoggedIn,
    Logout {
        ack: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Owns the session state machine and its timers.
pub struct SessionMonitor {
    controller: SessionController,
    source: Box<dyn ActivitySource>,
    listening: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    activity_tx: mpsc::UnboundedSender<ActivityKind>,
    activity_rx: mpsc::UnboundedReceiver<ActivityKind>,
    rejections: mpsc::UnboundedReceiver<Rejection>,
    tick: Option<Interval>,
    countdown: Option<Interval>,
    armed_generation: u64,
}

impl SessionMonitor {
    /// Build a monitor with the standard timings, using `api` for the
    /// best-effort logout notification.
    pub fn new(
        api: ApiClient,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        source: Box<dyn ActivitySource>,
    ) -> (Self, MonitorHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let notifier: Arc<dyn LogoutNotifier> = Arc::new(api.clone());
        Self::with_parts(api, store, clock, source, SessionTimings::default(), notifier)
    }

    pub fn with_parts(
        api: ApiClient,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        source: Box<dyn ActivitySource>,
        timings: SessionTimings,
        notifier: Arc<dyn LogoutNotifier>,
    ) -> (Self, MonitorHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (activity_tx, activity_rx) = mpsc::unbounded_channel();
        let (rejection_tx, rejection_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let api = api.with_rejection_sink(rejection_tx);
        let controller = SessionController::new(
            Arc::clone(&store),
            clock,
            timings,
            api.credential_slot(),
            notifier,
            event_tx,
        );

        let monitor = Self {
            controller,
            source,
            listening: false,
            commands: command_rx,
            activity_tx,
            activity_rx,
            rejections: rejection_rx,
            tick: None,
            countdown: None,
            armed_generation: 0,
        };
        let handle = MonitorHandle {
            commands: command_tx,
            api,
            store: Arc::clone(&store),
        };
        (monitor, handle, event_rx)
    }

    /// Run until every `MonitorHandle` is dropped or `shutdown` is called.
    pub async fn run(mut self) {
        info!("Session monitor started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(kind) = self.activity_rx.recv() => self.controller.on_activity(kind),
                Some(rejection) = self.rejections.recv() => self.controller.on_rejection(&rejection),
                _ = next_tick(&mut self.tick) => self.controller.evaluate(),
                _ = next_tick(&mut self.countdown) => self.controller.evaluate(),
            }
            self.sync_resources();
        }
        if self.listening {
            self.source.stop();
        }
        info!("Session monitor stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Begin { data, origin, ack } => {
                self.controller.begin(data, origin);
                let _ = ack.send(());
            }
            Command::StayLoggedIn => self.controller.stay_logged_in(),
            Command::Logout { ack } => {
                self.controller.logout();
                let _ = ack.send(());
            }
            Command::Shutdown => {}
        }
    }

    /// Arm listeners and timers for a live session; cancel them otherwise.
    fn sync_resources(&mut self) {
        let timings = *self.controller.timings();
        let Some(phase) = self.controller.phase() else {
            if self.listening {
                self.source.stop();
                self.listening = false;
                debug!("Activity listeners detached");
            }
            self.tick = None;
            self.countdown = None;
            return;
        };

        if self.armed_generation != self.controller.generation() {
            // Fresh session: fresh timers
            self.armed_generation = self.controller.generation();
            self.tick = Some(periodic(timings.tick_interval));
            self.countdown = None;
        }
        if !self.listening {
            self.source.start(self.activity_tx.clone());
            self.listening = true;
            debug!("Activity listeners attached");
        }

        if phase == SessionPhase::Warning {
            if self.countdown.is_none() {
                self.countdown = Some(periodic(timings.countdown_interval));
            }
        } else {
            self.countdown = None;
        }
    }
}

/// An interval whose first tick is one period from now. Ticks missed while
/// the process was stalled are skipped, not replayed.
fn periodic(period: Duration) -> Interval {
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Wait for the next tick of `interval`, or forever if it is not armed.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ============================================================================
// MonitorHandle
// ============================================================================

/// Cloneable command surface of a running `SessionMonitor`.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<Command>,
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
}

impl MonitorHandle {
    /// The API client wired to this monitor. Use it for every backend call so
    /// the credential is attached and rejections end the session.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Log in and start a session. Login failures leave no session behind.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, LoginError> {
        let success = self.api.login(username, password).await?;
        let identity = success.identity.clone();
        self.start_session(SessionData::new(success.token, success.identity), SessionOrigin::Login)
            .await;
        Ok(identity)
    }

    /// Adopt a credential verified at start-up.
    pub async fn resume(&self, data: SessionData) {
        self.start_session(data, SessionOrigin::Restored).await;
    }

    /// Start a session from an already-issued credential.
    pub async fn start_session(&self, data: SessionData, origin: SessionOrigin) {
        let (ack, done) = oneshot::channel();
        if self
            .commands
            .send(Command::Begin { data, origin, ack })
            .is_err()
        {
            warn!("Session monitor is not running");
            return;
        }
        let _ = done.await;
    }

    /// The "stay logged in" acknowledgement.
    pub fn stay_logged_in(&self) {
        let _ = self.commands.send(Command::StayLoggedIn);
    }

    /// Manual logout. Resolves once local state is cleared; the server
    /// notification continues in the background.
    pub async fn logout(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Logout { ack }).is_ok() && done.await.is_ok() {
            return;
        }
        warn!("Session monitor is not running; clearing stored session directly");
        self.api.set_credential(None);
        if let Err(e) = clear_session(self.store.as_ref()) {
            warn!(error = %e, "Failed to clear stored session");
        }
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

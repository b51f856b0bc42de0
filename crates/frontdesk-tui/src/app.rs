//! Application state management for the front desk terminal.
//!
//! `App` mirrors what the session monitor reports and never decides on its
//! own that a session is over. Every `SessionEvent::Ended` wipes the view
//! state and returns to the login form, the terminal equivalent of a hard
//! navigation to the entry point.

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use frontdesk_core::monitor::{ActivityFeed, ActivityKind, EndReason, MonitorHandle, SessionEvent};
use frontdesk_core::{AuthBootstrap, BootstrapOutcome, Config, Identity, LoginError, SignedOutReason};

use crate::models::{DashboardResponse, PatientRow};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Start-up verification of a stored session is in flight
    Loading,
    LoggingIn,
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

// ============================================================================
// Background Task Results
// ============================================================================

enum RefreshResult {
    Dashboard(DashboardResponse),
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    monitor: MonitorHandle,
    feed: ActivityFeed,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
    bootstrap_rx: Option<oneshot::Receiver<BootstrapOutcome>>,

    // UI State
    pub state: AppState,
    pub identity: Option<Identity>,
    /// Whole seconds left on the inactivity warning, while it is shown
    pub warning_seconds: Option<u64>,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Dashboard data
    pub queue: Vec<PatientRow>,
    pub patient_count: usize,
    pub queue_selection: usize,
    pub refreshing: bool,

    // Background task channel; results carry the session epoch they were
    // requested under
    refresh_rx: mpsc::Receiver<(u64, RefreshResult)>,
    refresh_tx: mpsc::Sender<(u64, RefreshResult)>,
    session_epoch: u64,

    pub status_message: Option<String>,
}

impl App {
    pub fn new(
        config: Config,
        monitor: MonitorHandle,
        feed: ActivityFeed,
        session_events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let login_username = config.last_username.clone().unwrap_or_default();

        Self {
            config,
            monitor,
            feed,
            session_events,
            bootstrap_rx: None,

            state: AppState::Loading,
            identity: None,
            warning_seconds: None,

            login_username,
            login_password: String::new(),
            login_focus: LoginFocus::Username,
            login_error: None,

            queue: Vec::new(),
            patient_count: 0,
            queue_selection: 0,
            refreshing: false,

            refresh_rx: rx,
            refresh_tx: tx,
            session_epoch: 0,

            status_message: None,
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Verify the stored session in the background; the loading gate stays
    /// up until it resolves.
    pub fn start_bootstrap(&mut self, bootstrap: AuthBootstrap) {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(bootstrap.run().await);
        });
        self.bootstrap_rx = Some(rx);
        self.state = AppState::Loading;
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        self.login_error = None;

        match self
            .monitor
            .login(&self.login_username, &self.login_password)
            .await
        {
            Ok(identity) => {
                self.config.last_username = Some(self.login_username.trim().to_string());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.login_password.clear();
                info!(username = %identity.username, "Login successful");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.login_error = Some(login_error_message(&e));
                Err(e.into())
            }
        }
    }

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
    }

    /// Manual logout. The monitor reports `Ended` once local state is gone.
    pub async fn logout(&mut self) {
        self.monitor.logout().await;
    }

    /// The "stay logged in" answer to the warning overlay
    pub fn stay_logged_in(&self) {
        self.monitor.stay_logged_in();
    }

    /// Forward an interaction event to the activity source
    pub fn record_activity(&self, kind: ActivityKind) {
        self.feed.emit(kind);
    }

    pub fn shutdown(&self) {
        self.monitor.shutdown();
    }

    // =========================================================================
    // Background Data Refresh
    // =========================================================================

    /// Fetch today's queue through the credentialed client
    pub fn refresh_dashboard(&mut self) {
        if !self.is_authenticated() {
            return;
        }

        let api = self.monitor.api().clone();
        let tx = self.refresh_tx.clone();
        let epoch = self.session_epoch;

        tokio::spawn(async move {
            let result = match api.get::<DashboardResponse>("/dashboard").await {
                Ok(dashboard) => RefreshResult::Dashboard(dashboard),
                Err(e) => RefreshResult::Error(e.to_string()),
            };
            if tx.send((epoch, result)).await.is_err() {
                debug!("Dashboard result dropped; app is gone");
            }
        });

        self.refreshing = true;
        self.status_message = Some("Refreshing queue...".to_string());
    }

    /// Check for completed background tasks and session events
    pub async fn check_background_tasks(&mut self) {
        if let Some(outcome) = self.poll_bootstrap() {
            self.finish_bootstrap(outcome).await;
        }

        while let Ok(event) = self.session_events.try_recv() {
            self.handle_session_event(event);
        }

        while let Ok((epoch, result)) = self.refresh_rx.try_recv() {
            if epoch != self.session_epoch {
                debug!("Discarding dashboard result from an ended session");
                continue;
            }
            self.process_refresh_result(result);
        }
    }

    fn poll_bootstrap(&mut self) -> Option<BootstrapOutcome> {
        let rx = self.bootstrap_rx.as_mut()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.bootstrap_rx = None;
                Some(outcome)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                warn!("Session verification task vanished");
                self.bootstrap_rx = None;
                Some(BootstrapOutcome::SignedOut(SignedOutReason::VerificationFailed))
            }
        }
    }

    async fn finish_bootstrap(&mut self, outcome: BootstrapOutcome) {
        match outcome {
            BootstrapOutcome::Authenticated(data) => {
                // The monitor answers with `Started`
                self.monitor.resume(data).await;
            }
            BootstrapOutcome::SignedOut(reason) => {
                debug!(?reason, "No usable stored session");
                self.login_error = signed_out_message(reason).map(str::to_string);
                self.start_login();
            }
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Started(identity) => {
                self.identity = Some(identity);
                self.warning_seconds = None;
                self.login_error = None;
                self.state = AppState::Normal;
                self.refresh_dashboard();
            }
            SessionEvent::WarningShown { seconds } | SessionEvent::Countdown { seconds } => {
                self.warning_seconds = Some(seconds);
            }
            SessionEvent::WarningCleared => {
                self.warning_seconds = None;
            }
            SessionEvent::Ended(reason) => self.end_session(reason),
        }
    }

    /// Discard everything tied to the ended session and show the login form.
    fn end_session(&mut self, reason: EndReason) {
        info!(?reason, "Session ended; returning to login");
        self.session_epoch += 1;

        self.identity = None;
        self.warning_seconds = None;
        self.queue.clear();
        self.patient_count = 0;
        self.queue_selection = 0;
        self.refreshing = false;
        self.status_message = None;
        self.login_password.clear();
        self.login_error = end_reason_message(reason).map(str::to_string);

        self.start_login();
    }

    fn process_refresh_result(&mut self, result: RefreshResult) {
        self.refreshing = false;
        match result {
            RefreshResult::Dashboard(dashboard) => {
                self.patient_count = dashboard.all.len();
                self.queue = dashboard.queue;
                self.queue_selection = self
                    .queue_selection
                    .min(self.queue.len().saturating_sub(1));
                self.status_message = Some(format!("{} waiting", self.queue.len()));
            }
            RefreshResult::Error(msg) => {
                warn!(error = %msg, "Dashboard refresh failed");
                self.status_message = Some(format!("Refresh failed: {}", msg));
            }
        }
    }

    // =========================================================================
    // Queue navigation
    // =========================================================================

    pub fn selected_patient(&self) -> Option<&PatientRow> {
        self.queue.get(self.queue_selection)
    }

    pub fn select_next(&mut self) {
        if self.queue_selection + 1 < self.queue.len() {
            self.queue_selection += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.queue_selection = self.queue_selection.saturating_sub(1);
    }
}

// ============================================================================
// User-facing messages
// ============================================================================

/// Message shown on the login form after a failed attempt
pub fn login_error_message(error: &LoginError) -> String {
    match error {
        LoginError::MissingCredentials => "Username and password required".to_string(),
        LoginError::Rejected(msg) if msg.trim().is_empty() => {
            "Invalid username or password".to_string()
        }
        LoginError::Rejected(msg) => msg.clone(),
        LoginError::Network(e) if e.is_network() => {
            "Unable to connect to server. Check your connection.".to_string()
        }
        LoginError::Network(e) => format!("Login failed: {}", e),
    }
}

/// Message shown on the login form after a session ends
pub fn end_reason_message(reason: EndReason) -> Option<&'static str> {
    match reason {
        EndReason::Expired => Some("Logged out after 5 minutes of inactivity"),
        EndReason::Rejected => Some("Your session is no longer valid. Please log in again."),
        EndReason::Unreachable => Some("Lost contact with the server. Please log in again."),
        EndReason::LoggedOut => None,
    }
}

fn signed_out_message(reason: SignedOutReason) -> Option<&'static str> {
    match reason {
        SignedOutReason::NoCredential => None,
        SignedOutReason::Expired => end_reason_message(EndReason::Expired),
        SignedOutReason::Rejected => end_reason_message(EndReason::Rejected),
        SignedOutReason::VerificationFailed => Some("Could not verify your session. Please log in."),
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

//! Start-up verification of a persisted credential.
//!
//! Runs once per process before the host shows anything that depends on a
//! login. A credential whose inactivity already exceeds the timeout is
//! dropped without a network round trip; anything else gets exactly one
//! identity check, and every failure clears local state.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::monitor::phase::{evaluate, SessionPhase, SessionTimings};
use crate::monitor::Clock;
use crate::storage::{read_last_activity, KeyValueStore};

use super::{Session, SessionData};

/// Why start-up ended without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedOutReason {
    /// Nothing was persisted.
    NoCredential,
    /// The persisted session was idle past the timeout.
    Expired,
    /// The server refused the credential.
    Rejected,
    /// The identity check failed for any other reason.
    VerificationFailed,
}

#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    Authenticated(SessionData),
    SignedOut(SignedOutReason),
}

impl BootstrapOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, BootstrapOutcome::Authenticated(_))
    }
}

pub struct AuthBootstrap {
    api: ApiClient,
    session: Session,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    timings: SessionTimings,
}

impl AuthBootstrap {
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_timings(api, store, clock, SessionTimings::default())
    }

    pub fn with_timings(
        api: ApiClient,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        timings: SessionTimings,
    ) -> Self {
        Self {
            api,
            session: Session::new(Arc::clone(&store)),
            store,
            clock,
            timings,
        }
    }

    fn sign_out(&mut self, reason: SignedOutReason) -> BootstrapOutcome {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
        BootstrapOutcome::SignedOut(reason)
    }

    /// Decide whether the persisted credential can be trusted.
    pub async fn run(mut self) -> BootstrapOutcome {
        let credential = match self.session.persisted_credential() {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                debug!("No persisted credential");
                return self.sign_out(SignedOutReason::NoCredential);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                return self.sign_out(SignedOutReason::NoCredential);
            }
        };

        let last_activity = read_last_activity(self.store.as_ref());
        let evaluation = evaluate(self.clock.now_ms(), last_activity, &self.timings);
        if evaluation.phase == SessionPhase::Expired {
            info!(
                idle_secs = evaluation.elapsed.as_secs(),
                "Persisted session idle past timeout; discarding"
            );
            return self.sign_out(SignedOutReason::Expired);
        }

        match self.api.identity_check(&credential).await {
            Ok(identity) => {
                info!(username = %identity.username, "Persisted session verified");
                BootstrapOutcome::Authenticated(SessionData::new(credential, identity))
            }
            Err(e) if e.is_rejection() => {
                info!("Persisted credential rejected");
                self.sign_out(SignedOutReason::Rejected)
            }
            Err(e) => {
                warn!(error = %e, "Identity check failed");
                self.sign_out(SignedOutReason::VerificationFailed)
            }
        }
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::Identity;
use crate::storage::{clear_session, KeyValueStore, StorageError, CREDENTIAL_KEY};

/// An authenticated login held by this process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub credential: String,
    pub identity: Identity,
    pub started_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(credential: String, identity: Identity) -> Self {
        Self {
            credential,
            identity,
            started_at: Utc::now(),
        }
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }
}

/// The in-memory session plus its persisted credential.
///
/// The credential and the activity record are cleared together; there is no
/// way to drop one without the other.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    data: Option<SessionData>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, data: None }
    }

    /// Credential persisted by a previous process, if any
    pub fn persisted_credential(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .get(CREDENTIAL_KEY)?
            .filter(|token| !token.trim().is_empty()))
    }

    /// Persist the credential of the current session
    pub fn save(&self) -> Result<(), StorageError> {
        if let Some(ref data) = self.data {
            self.store.set(CREDENTIAL_KEY, &data.credential)?;
        }
        Ok(())
    }

    /// Clear session data, the persisted credential and the activity record
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.data = None;
        clear_session(self.store.as_ref())
    }

    /// Take the session out, leaving none. Storage is untouched.
    pub fn take(&mut self) -> Option<SessionData> {
        self.data.take()
    }

    /// Update session with new data
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer credential if a session exists
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.credential.as_str())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.data.as_ref().map(|d| &d.identity)
    }

    pub fn is_active(&self) -> bool {
        self.data.is_some()
    }
}

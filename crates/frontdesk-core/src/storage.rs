//! Durable client-local key/value storage.
//!
//! Two keys matter to the session lifecycle: the bearer credential and the
//! last-activity timestamp. Both live in storage that outlives the process
//! and is shared by every front-desk process on the same device, so activity
//! in one window keeps the login alive for all of them (last write wins).

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key holding the opaque bearer credential
pub const CREDENTIAL_KEY: &str = "jv_token";

/// Storage key holding the last qualifying activity, decimal epoch millis
pub const LAST_ACTIVITY_KEY: &str = "jv_last_activity";

/// File name used by `FileStore` inside its directory
const STORE_FILE: &str = "session.json";

/// Lock file serializing `FileStore` writers across processes
const LOCK_FILE: &str = "session.lock";

/// Keychain service name used by `KeyringStore`
const KEYRING_SERVICE: &str = "frontdesk";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Could not find a storage directory")]
    NoStorageDir,
}

/// A durable string key/value store.
///
/// Implementations must not cache values in memory: every `get` observes the
/// latest value written by any process sharing the store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// Activity record helpers
// ============================================================================

/// Read the last-activity timestamp.
///
/// A missing, unreadable or unparseable value is reported as `None`; callers
/// treat that as "no activity recorded yet".
pub fn read_last_activity(store: &dyn KeyValueStore) -> Option<i64> {
    match store.get(LAST_ACTIVITY_KEY) {
        Ok(Some(raw)) => match raw.trim().parse::<i64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                warn!(value = %raw, "Ignoring unparseable last-activity value");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Failed to read last-activity value");
            None
        }
    }
}

/// Write the last-activity timestamp as decimal epoch milliseconds.
pub fn write_last_activity(store: &dyn KeyValueStore, epoch_ms: i64) -> Result<(), StorageError> {
    store.set(LAST_ACTIVITY_KEY, &epoch_ms.to_string())
}

/// Remove the credential and the activity record together.
///
/// Both removals are always attempted; the first error (if any) is returned.
pub fn clear_session(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    let credential = store.remove(CREDENTIAL_KEY);
    let activity = store.remove(LAST_ACTIVITY_KEY);
    credential.and(activity)
}

// ============================================================================
// File-backed store
// ============================================================================

/// Store backed by a single JSON object file.
///
/// Reads always go to disk. Writes replace the file through a temp file and a
/// rename so a concurrent reader never sees a half-written object. Each
/// read-modify-write holds an exclusive `flock` on a sidecar lock file, so a
/// process stamping activity cannot write back a credential another process
/// just removed.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&dir)?;
        debug!(?dir, "Session store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let path = self.path();
        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", STORE_FILE, std::process::id()));
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        // Released when the file is closed at the end of this scope
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        flock_exclusive(&lock)?;
        let mut map = self.read_map()?;
        if f(&mut map) {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|map| map.remove(key).is_some())
    }
}

/// Block until an exclusive flock on `file` is held.
fn flock_exclusive(file: &File) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        loop {
            // SAFETY: fd is a valid descriptor owned by `file` for the whole call.
            let result = unsafe { libc::flock(fd, libc::LOCK_EX) };
            if result == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("dir", &self.dir).finish()
    }
}

// ============================================================================
// OS keychain store
// ============================================================================

/// Store that keeps each key as a separate OS keychain entry.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, used by tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

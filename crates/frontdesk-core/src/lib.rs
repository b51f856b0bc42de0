//! Core library for the clinic front desk.
//!
//! This crate holds everything the front desk needs to talk to the clinic
//! backend while keeping a staff login honest about inactivity:
//!
//! - `api`: the credentialed HTTP client (`ApiClient`) and its error type
//! - `auth`: the in-memory `Session` and the start-up `AuthBootstrap`
//! - `monitor`: activity recording, phase evaluation and the session
//!   state machine that decides when a login must end
//! - `storage`: durable client-local key/value storage shared by every
//!   front-desk process on the device
//! - `config`: user configuration (API URL, last username, storage backend)

pub mod api;
pub mod auth;
pub mod config;
pub mod monitor;
pub mod storage;

pub use api::{ApiClient, ApiError, Identity, LoginError, Role};
pub use auth::{AuthBootstrap, BootstrapOutcome, Session, SessionData, SignedOutReason};
pub use config::{Config, StorageBackend};
pub use monitor::{
    ActivityFeed, ActivityKind, ChannelActivitySource, Clock, EndReason, ManualClock,
    MonitorHandle, SessionEvent, SessionMonitor, SessionPhase, SessionTimings, SystemClock,
};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError};

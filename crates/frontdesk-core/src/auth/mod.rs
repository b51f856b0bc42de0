//! Authentication state for the front desk.
//!
//! This module provides:
//! - `Session`: the in-memory login and its persisted credential
//! - `AuthBootstrap`: one-shot verification of a persisted credential at start-up

pub mod bootstrap;
pub mod session;

pub use bootstrap::{AuthBootstrap, BootstrapOutcome, SignedOutReason};
pub use session::{Session, SessionData};

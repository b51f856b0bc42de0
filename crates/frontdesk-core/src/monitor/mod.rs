//! Session lifecycle monitoring.
//!
//! This module decides, from interaction events and elapsed wall-clock time,
//! whether a login is still alive, needs a countdown warning, or must end:
//!
//! - `clock`: injectable wall clock
//! - `phase`: stateless phase derivation (`SessionClock`)
//! - `activity`: qualifying-event filtering and the shared activity record
//! - `controller`: the state machine and its single teardown path
//! - `runner`: the event loop that drives the controller

pub mod activity;
pub mod clock;
pub mod controller;
pub mod phase;
pub mod runner;

pub use activity::{ActivityFeed, ActivityKind, ActivityRecorder, ActivitySource, ChannelActivitySource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{EndReason, LogoutNotifier, SessionController, SessionEvent, SessionOrigin};
pub use phase::{Evaluation, SessionClock, SessionPhase, SessionTimings};
pub use runner::{MonitorHandle, SessionMonitor};

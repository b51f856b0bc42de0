//! Activity detection and recording.
//!
//! Only deliberate input keeps a login alive: a pointer press, a key press or
//! a touch start. Pointer movement and scrolling are reported by hosts but
//! never refresh the activity record, so a screen left with the mouse resting
//! on it still times out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::storage::{read_last_activity, write_last_activity, KeyValueStore};

use super::clock::Clock;

/// Interaction events a host can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerPress,
    KeyPress,
    TouchStart,
    PointerMove,
    Scroll,
}

impl ActivityKind {
    /// Whether this event resets the inactivity clock.
    pub fn is_qualifying(&self) -> bool {
        matches!(
            self,
            ActivityKind::PointerPress | ActivityKind::KeyPress | ActivityKind::TouchStart
        )
    }
}

// ============================================================================
// ActivityRecorder
// ============================================================================

/// Stamps the shared last-activity record while a session exists.
///
/// Cheap to call at any frequency and never touches the network. When the
/// recorder is disarmed every call is a silent no-op.
#[derive(Clone)]
pub struct ActivityRecorder {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    armed: Arc<AtomicBool>,
}

impl ActivityRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Record `kind` if it qualifies. Returns true if the record was written.
    pub fn record(&self, kind: ActivityKind) -> bool {
        if !kind.is_qualifying() {
            trace!(?kind, "Ignoring non-qualifying activity");
            return false;
        }
        self.register_activity()
    }

    /// Write "now" to the activity record. Returns true if the record was written.
    ///
    /// The record never moves backwards: if another context already stored a
    /// later timestamp it is kept.
    pub fn register_activity(&self) -> bool {
        if !self.is_armed() {
            return false;
        }
        let now = self.clock.now_ms();
        let stamp = read_last_activity(self.store.as_ref())
            .map_or(now, |existing| existing.max(now));
        match write_last_activity(self.store.as_ref(), stamp) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to record activity");
                false
            }
        }
    }
}

// ============================================================================
// Activity sources
// ============================================================================

/// A host capability that observes interaction events.
///
/// `start` attaches listeners that forward events into `sink`; `stop` detaches
/// them. Events that race past `stop` are harmless because the recorder is
/// disarmed at the same time.
pub trait ActivitySource: Send {
    fn start(&mut self, sink: mpsc::UnboundedSender<ActivityKind>);
    fn stop(&mut self);
}

/// An activity source fed by hand through `ActivityFeed` handles.
///
/// Hosts that already own an input loop (a terminal event poll, a test)
/// push events into a feed; the feed forwards them only while started.
#[derive(Debug, Default)]
pub struct ChannelActivitySource {
    sink: Arc<Mutex<Option<mpsc::UnboundedSender<ActivityKind>>>>,
}

impl ChannelActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> ActivityFeed {
        ActivityFeed {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl ActivitySource for ChannelActivitySource {
    fn start(&mut self, sink: mpsc::UnboundedSender<ActivityKind>) {
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);
    }

    fn stop(&mut self) {
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Cloneable handle that pushes events into a `ChannelActivitySource`.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    sink: Arc<Mutex<Option<mpsc::UnboundedSender<ActivityKind>>>>,
}

impl ActivityFeed {
    /// Forward an event. Returns false when no session is listening.
    pub fn emit(&self, kind: ActivityKind) -> bool {
        let sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        match sink.as_ref() {
            Some(tx) => tx.send(kind).is_ok(),
            None => false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Session phase derivation.
//!
//! The phase is never stored. Every evaluation re-reads the persisted
//! last-activity timestamp and classifies the elapsed time against two
//! fixed constants:
//!
//! ```text
//!   0 ────────── timeout - warning_window ────────── timeout ──────────▶ elapsed
//!   │   Active   │            Warning                │      Expired
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::storage::{read_last_activity, KeyValueStore};

use super::clock::Clock;

// ============================================================================
// Constants
// ============================================================================

/// Inactivity after which a login is forcibly ended.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Trailing span of the timeout during which the countdown is shown.
pub const WARNING_WINDOW: Duration = Duration::from_secs(30);

/// Period of the phase evaluator. A transition is never observed more than
/// one interval late.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Countdown redraw period while the warning is visible.
pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

/// Timing constants for the session lifecycle.
///
/// Production code always uses `SessionTimings::default()`; other values only
/// exist so tests can shrink the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub timeout: Duration,
    pub warning_window: Duration,
    pub tick_interval: Duration,
    pub countdown_interval: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            timeout: SESSION_TIMEOUT,
            warning_window: WARNING_WINDOW,
            tick_interval: TICK_INTERVAL,
            countdown_interval: COUNTDOWN_INTERVAL,
        }
    }
}

impl SessionTimings {
    /// Elapsed inactivity at which the warning starts.
    pub fn warning_threshold(&self) -> Duration {
        self.timeout.saturating_sub(self.warning_window)
    }
}

// ============================================================================
// Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Active,
    Warning,
    Expired,
}

/// Result of one phase evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub phase: SessionPhase,
    pub elapsed: Duration,
    pub remaining: Duration,
}

impl Evaluation {
    /// Whole seconds left before expiry, rounded up.
    ///
    /// Only meaningful while the phase is `Warning`, where it is always >= 1.
    pub fn countdown_secs(&self) -> u64 {
        let ms = self.remaining.as_millis() as u64;
        ms.div_ceil(1000)
    }
}

/// Classify inactivity at `now_ms` given the last recorded activity.
///
/// A missing record counts as activity right now (a fresh login that has not
/// seen an event yet is active, not expired). A record in the future, written
/// by a context with a faster clock, counts as zero elapsed time.
pub fn evaluate(now_ms: i64, last_activity_ms: Option<i64>, timings: &SessionTimings) -> Evaluation {
    let last = last_activity_ms.unwrap_or(now_ms);
    let elapsed = Duration::from_millis(now_ms.saturating_sub(last).max(0) as u64);
    let remaining = timings.timeout.saturating_sub(elapsed);

    let phase = if elapsed >= timings.timeout {
        SessionPhase::Expired
    } else if elapsed >= timings.warning_threshold() {
        SessionPhase::Warning
    } else {
        SessionPhase::Active
    };

    Evaluation {
        phase,
        elapsed,
        remaining,
    }
}

// ============================================================================
// SessionClock
// ============================================================================

/// Read-only phase evaluator over the shared activity record.
#[derive(Clone)]
pub struct SessionClock {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    timings: SessionTimings,
}

impl SessionClock {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, timings: SessionTimings) -> Self {
        Self {
            store,
            clock,
            timings,
        }
    }

    pub fn timings(&self) -> &SessionTimings {
        &self.timings
    }

    /// Evaluate the phase against the latest persisted activity.
    ///
    /// `fallback_ms` stands in for a missing record. A live session passes
    /// the moment it began, so a record that vanished (or was never written)
    /// cannot keep it alive forever.
    pub fn evaluate(&self, fallback_ms: i64) -> Evaluation {
        let now = self.clock.now_ms();
        let last = read_last_activity(self.store.as_ref()).unwrap_or(fallback_ms);
        let evaluation = evaluate(now, Some(last), &self.timings);
        trace!(
            phase = ?evaluation.phase,
            elapsed_ms = evaluation.elapsed.as_millis() as u64,
            "Session evaluated"
        );
        evaluation
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::clock::ManualClock;
    use crate::storage::{write_last_activity, MemoryStore};

    fn secs(s: i64) -> i64 {
        s * 1000
    }

    #[test]
    fn test_default_timings() {
        let t = SessionTimings::default();
        assert_eq!(t.timeout, Duration::from_secs(300));
        assert_eq!(t.warning_window, Duration::from_secs(30));
        assert_eq!(t.tick_interval, Duration::from_secs(5));
        assert_eq!(t.warning_threshold(), Duration::from_secs(270));
    }

    #[test]
    fn test_phase_boundaries() {
        let t = SessionTimings::default();
        assert_eq!(evaluate(secs(270) - 1, Some(0), &t).phase, SessionPhase::Active);
        assert_eq!(evaluate(secs(270), Some(0), &t).phase, SessionPhase::Warning);
        assert_eq!(evaluate(secs(300) - 1, Some(0), &t).phase, SessionPhase::Warning);
        assert_eq!(evaluate(secs(300), Some(0), &t).phase, SessionPhase::Expired);
        assert_eq!(evaluate(secs(3600), Some(0), &t).phase, SessionPhase::Expired);
    }

    #[test]
    fn test_warning_starts_with_full_window() {
        let eval = evaluate(secs(270), Some(0), &SessionTimings::default());
        assert_eq!(eval.remaining, Duration::from_secs(30));
        assert_eq!(eval.countdown_secs(), 30);
    }

    #[test]
    fn test_countdown_rounds_up() {
        let t = SessionTimings::default();
        assert_eq!(evaluate(secs(299) + 500, Some(0), &t).countdown_secs(), 1);
        assert_eq!(evaluate(secs(285) + 1, Some(0), &t).countdown_secs(), 15);
        assert_eq!(evaluate(secs(300), Some(0), &t).countdown_secs(), 0);
    }

    #[test]
    fn test_missing_record_is_fresh() {
        let eval = evaluate(secs(10_000), None, &SessionTimings::default());
        assert_eq!(eval.phase, SessionPhase::Active);
        assert_eq!(eval.elapsed, Duration::ZERO);
    }

    #[test]
    fn test_future_record_counts_as_zero_elapsed() {
        let eval = evaluate(secs(100), Some(secs(160)), &SessionTimings::default());
        assert_eq!(eval.phase, SessionPhase::Active);
        assert_eq!(eval.remaining, Duration::from_secs(300));
    }

    #[test]
    fn test_session_clock_rereads_store_every_time() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let session_clock = SessionClock::new(
            store.clone(),
            Arc::new(clock.clone()),
            SessionTimings::default(),
        );

        write_last_activity(store.as_ref(), 0).unwrap();
        clock.set(secs(280));
        assert_eq!(session_clock.evaluate(0).phase, SessionPhase::Warning);

        // Another context records activity; no cached copy hides it
        write_last_activity(store.as_ref(), secs(279)).unwrap();
        assert_eq!(session_clock.evaluate(0).phase, SessionPhase::Active);
    }

    #[test]
    fn test_session_clock_measures_missing_record_from_fallback() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(secs(1000));
        let session_clock = SessionClock::new(
            store.clone(),
            Arc::new(clock.clone()),
            SessionTimings::default(),
        );

        assert_eq!(session_clock.evaluate(secs(1000)).phase, SessionPhase::Active);
        clock.set(secs(1280));
        assert_eq!(session_clock.evaluate(secs(1000)).phase, SessionPhase::Warning);
        clock.set(secs(4600));
        assert_eq!(session_clock.evaluate(secs(1000)).phase, SessionPhase::Expired);
    }
}

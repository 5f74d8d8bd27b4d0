//! Reconnect scheduler.
//!
//! Holds at most one pending reconnect deadline. The delay is constant: no
//! growth between attempts and no attempt cap.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// Constants
// ============================================================================

/// Stand-in deadline when the interval overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// ============================================================================
// ReconnectScheduler
// ============================================================================

/// Single-slot, fixed-interval reconnect timer.
///
/// The owner polls [`deadline`](Self::deadline) and calls
/// [`fire`](Self::fire) once it has passed.
#[derive(Debug, Clone)]
pub(crate) struct ReconnectScheduler {
    /// Delay between a disconnect and the retry.
    interval: Duration,
    /// When the pending retry is due.
    deadline: Option<Instant>,
}

impl ReconnectScheduler {
    /// Creates an idle scheduler.
    #[inline]
    pub(crate) const fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Returns the retry delay.
    #[inline]
    pub(crate) const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the pending deadline, if any.
    #[inline]
    pub(crate) const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if a retry is pending.
    #[inline]
    pub(crate) const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Schedules a retry one interval from now.
    ///
    /// Returns `false` and leaves the existing deadline alone if a retry is
    /// already pending.
    pub(crate) fn schedule(&mut self) -> bool {
        if self.is_pending() {
            return false;
        }
        let now = Instant::now();
        self.deadline = Some(
            now.checked_add(self.interval)
                .unwrap_or_else(|| now + FAR_FUTURE),
        );
        true
    }

    /// Drops the pending retry. Returns `true` if one was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Consumes the pending retry if it is due.
    pub(crate) fn fire(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

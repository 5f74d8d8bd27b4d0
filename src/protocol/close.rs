//! Close event and status codes.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Normal closure; the only code that does not trigger a reconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close frame carried no status code.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

// ============================================================================
// CloseEvent
// ============================================================================

/// Close notification delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseEvent {
    /// WebSocket close status code.
    pub code: u16,
    /// Whether the closing handshake completed.
    pub was_clean: bool,
    /// Close reason sent by the peer (may be empty).
    pub reason: String,
}

impl CloseEvent {
    /// Creates a close event.
    #[inline]
    #[must_use]
    pub fn new(code: u16, was_clean: bool, reason: impl Into<String>) -> Self {
        Self {
            code,
            was_clean,
            reason: reason.into(),
        }
    }

    /// Creates a clean, normal close (code 1000).
    #[inline]
    #[must_use]
    pub fn normal() -> Self {
        Self::new(NORMAL_CLOSURE, true, "")
    }

    /// Creates an unclean close for a dropped connection (code 1006).
    #[inline]
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(ABNORMAL_CLOSURE, false, reason)
    }

    /// Returns `true` for code 1000.
    #[inline]
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }

    /// Returns `true` for any code other than 1000, whatever `was_clean` says.
    #[inline]
    #[must_use]
    pub const fn is_abnormal(&self) -> bool {
        !self.is_normal()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Connection readiness state.
//!
//! Values follow the WebSocket `readyState` constants, extended with
//! `Unset` (-1) for a client that has not attempted a connection yet.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ConnectionState
// ============================================================================

/// Readiness phase of the client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection attempt has begun.
    #[default]
    Unset,
    /// Opening handshake in progress.
    Connecting,
    /// Connection established; messages may be sent.
    Open,
    /// Closing handshake in progress.
    Closing,
    /// Connection closed or could not be opened.
    Closed,
}

impl ConnectionState {
    /// Returns the numeric readiness value (`-1` for [`Self::Unset`]).
    #[inline]
    #[must_use]
    pub const fn ready_state(self) -> i8 {
        match self {
            Self::Unset => -1,
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }

    /// Maps a numeric readiness value back to a state.
    #[must_use]
    pub const fn from_ready_state(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Self::Unset),
            0 => Some(Self::Connecting),
            1 => Some(Self::Open),
            2 => Some(Self::Closing),
            3 => Some(Self::Closed),
            _ => None,
        }
    }

    /// Returns `true` while a connection handle exists.
    #[inline]
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Closing)
    }

    /// Returns `true` if messages may be sent.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unset => "unset",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Outbound notifications and observable snapshots.
//!
//! Observers receive one [`Notification`] per lifecycle event and may read a
//! [`ClientSnapshot`] at any time. Both are copies; nothing here gives
//! write access to the client.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::error::ErrorDetail;

use super::{ConnectionState, Payload};

// ============================================================================
// Notification
// ============================================================================

/// A lifecycle event published to observers.
///
/// # Format
///
/// ```json
/// { "type": "closed", "clean": false, "code": 1006, "reason": "" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// The readiness state changed.
    StateChanged {
        /// New state.
        state: ConnectionState,
    },

    /// The connection is open.
    Opened,

    /// The connection closed.
    Closed {
        /// Whether the closing handshake completed.
        clean: bool,
        /// Close status code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// A message arrived and decoded.
    Message {
        /// Decoded payload.
        payload: Payload,
    },

    /// An error was observed.
    ErrorOccurred {
        /// Error snapshot.
        detail: ErrorDetail,
    },
}

// ============================================================================
// AuditTrail
// ============================================================================

/// Last-observed payload copies.
///
/// Each field is overwritten by the next matching event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    /// Wire text of the last successfully sent message.
    pub last_request: Option<String>,
    /// Last successfully decoded incoming message.
    pub last_response: Option<Payload>,
    /// Last error reported by the client.
    pub last_error: Option<ErrorDetail>,
}

// ============================================================================
// ClientSnapshot
// ============================================================================

/// Point-in-time view of a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    /// Readiness state.
    pub state: ConnectionState,
    /// Audit trail.
    #[serde(flatten)]
    pub audit: AuditTrail,
}

// ============================================================================
// Tests
// ============================================================================

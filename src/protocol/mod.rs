//! Connection lifecycle vocabulary.
//!
//! This module defines the values exchanged between the client, its
//! transport and its observers.
//!
//! # Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `ConnectionState` | Client → Observer | Readiness phase |
//! | `CloseEvent` | Transport → Client | Close code, clean flag, reason |
//! | `Payload` | Transport → Observer | Decoded incoming message |
//! | `Notification` | Client → Observer | One per lifecycle event |
//! | `AuditTrail` | Client → Observer | Last request/response/error |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `close` | Close event and status codes |
//! | `codec` | Payload encoding and decoding |
//! | `notification` | Notifications and audit snapshots |
//! | `state` | Connection readiness state |

// ============================================================================
// Submodules
// ============================================================================

/// Close event and status codes.
pub mod close;

/// Payload encoding and decoding.
pub mod codec;

/// Outbound notifications and observable snapshots.
pub mod notification;

/// Connection readiness state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use close::CloseEvent;
pub use codec::{Payload, PayloadCodec, PayloadEncoding};
pub use notification::{AuditTrail, ClientSnapshot, Notification};
pub use state::ConnectionState;

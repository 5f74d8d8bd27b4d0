//! Error types for the reconnecting WebSocket client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Client operations never surface transport failures to the caller. They are
//! reported through [`Notification::ErrorOccurred`] and recorded in the
//! [`AuditTrail`]. The few handle methods that can fail return [`Result<T>`]:
//!
//! ```ignore
//! use reconnecting_websocket::{ReconnectingClient, Result};
//!
//! fn example(client: &ReconnectingClient) -> Result<()> {
//!     client.send(&serde_json::json!({ "op": "ping" }))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::Transport`], [`Error::ConnectionRefused`], [`Error::ConnectionTimeout`] |
//! | Payload | [`Error::Decode`], [`Error::Json`] |
//! | Client | [`Error::ClientClosed`] |
//! | External | [`Error::Io`], [`Error::WebSocket`] |
//!
//! [`Notification::ErrorOccurred`]: crate::protocol::Notification::ErrorOccurred
//! [`AuditTrail`]: crate::protocol::AuditTrail

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use serde::Serialize;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the URL is missing or invalid, or when the builder
    /// rejects a setting.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Failure raised by the transport on connect or send.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The remote end refused the TCP connection.
    ///
    /// Does not trigger the reconnect policy on its own.
    #[error("Connection refused: {message}")]
    ConnectionRefused {
        /// Description from the underlying socket error.
        message: String,
    },

    /// The opening handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Payload Errors
    // ========================================================================
    /// Incoming payload could not be decoded under the JSON encoding.
    #[error("Decode error: {source}")]
    Decode {
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    // ========================================================================
    // Client Errors
    // ========================================================================
    /// The client task has terminated and no longer accepts commands.
    #[error("Client closed")]
    ClientClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a connection refused error.
    #[inline]
    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::ConnectionRefused {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a decode error from a JSON parse failure.
    #[inline]
    pub fn decode(source: serde_json::Error) -> Self {
        Self::Decode { source }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the remote end refused the connection.
    #[inline]
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        match self {
            Self::ConnectionRefused { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::ConnectionRefused,
            Self::WebSocket(WsError::Io(err)) => {
                err.kind() == std::io::ErrorKind::ConnectionRefused
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a connection-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::ConnectionRefused { .. }
                | Self::ConnectionTimeout { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error may clear up on a later attempt.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::ConnectionRefused { .. }
                | Self::ConnectionTimeout { .. }
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            _ if self.is_connection_refused() => ErrorKind::ConnectionRefused,
            Self::Transport { .. }
            | Self::ConnectionTimeout { .. }
            | Self::WebSocket(_)
            | Self::Io(_) => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Json(_) => ErrorKind::Encode,
            Self::ClientClosed => ErrorKind::ClientClosed,
            Self::ConnectionRefused { .. } => ErrorKind::ConnectionRefused,
        }
    }

    /// Returns a cloneable snapshot of this error for observers.
    #[must_use]
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

// ============================================================================
// ErrorKind
// ============================================================================

/// Error category carried in notifications and the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Config,
    /// Transport failure on connect or send.
    Transport,
    /// The remote end refused the connection.
    ConnectionRefused,
    /// Incoming payload failed to decode.
    Decode,
    /// Outgoing payload failed to encode.
    Encode,
    /// The client task has terminated.
    ClientClosed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Transport => "transport",
            Self::ConnectionRefused => "connection_refused",
            Self::Decode => "decode",
            Self::Encode => "encode",
            Self::ClientClosed => "client_closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ErrorDetail
// ============================================================================

/// Observable copy of an [`enum@Error`].
///
/// [`enum@Error`] wraps non-cloneable sources; this is what notifications and
/// snapshots hand out instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    /// Error category.
    pub kind: ErrorKind,
    /// Rendered error message.
    pub message: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl From<&Error> for ErrorDetail {
    fn from(err: &Error) -> Self {
        err.detail()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Reconnecting WebSocket client.
//!
//! This library wraps a WebSocket transport with an observable connection
//! lifecycle and fixed-interval auto-reconnect.
//!
//! # Architecture
//!
//! The client follows a handle/task model:
//!
//! - **Handle ([`ReconnectingClient`])**: Cloneable, sends commands, reads snapshots
//! - **Task**: Owns the state machine, the live connection and the reconnect timer
//! - **Transport**: Injected capability that performs the actual I/O
//!
//! Key design principles:
//!
//! - One task per client serializes every state transition
//! - At most one live connection; replaced, never mutated, on reconnect
//! - Observers only see copies: [`Notification`]s and [`ClientSnapshot`]s
//! - Failures are reported, never thrown at the caller
//!
//! # Quick Start
//!
//! ```no_run
//! use reconnecting_websocket::{Notification, PayloadEncoding, ReconnectingClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ReconnectingClient::builder()
//!         .url("ws://127.0.0.1:9001/feed")
//!         .payload_encoding(PayloadEncoding::Json)
//!         .auto_connect(true)
//!         .build()?;
//!
//!     let mut notifications = client.subscribe();
//!     while let Ok(notification) = notifications.recv().await {
//!         match notification {
//!             Notification::Opened => client.send(&serde_json::json!({ "op": "hello" }))?,
//!             Notification::Message { payload } => println!("received {payload:?}"),
//!             other => println!("{other:?}"),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ReconnectingClient`], [`ClientBuilder`], [`ClientConfig`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | States, close events, payloads, notifications |
//! | [`transport`] | Transport trait and bundled transports |

// ============================================================================
// Modules
// ============================================================================

/// Reconnecting client.
///
/// Use [`ReconnectingClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers for clients and connections.
pub mod identifiers;

/// Connection lifecycle vocabulary.
pub mod protocol;

/// Transport capability and implementations.
///
/// [`TungsteniteTransport`] is used unless another transport is injected.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ClientConfig, ReconnectingClient};

// Error types
pub use error::{Error, ErrorDetail, ErrorKind, Result};

// Identifier types
pub use identifiers::{ClientId, ConnectionId};

// Protocol types
pub use protocol::{
    AuditTrail, ClientSnapshot, CloseEvent, ConnectionState, Notification, Payload,
    PayloadCodec, PayloadEncoding,
};

// Transport types
pub use transport::{
    EventSink, MemoryConnection, MemoryTransport, Subscription, Transport, TransportEvent,
    TransportHandle, TungsteniteTransport,
};

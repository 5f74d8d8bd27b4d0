//! Transport capability consumed by the client.
//!
//! The client does not speak the WebSocket wire protocol itself. It is given
//! a [`Transport`] that opens connections and reports their progress as
//! [`TransportEvent`]s through an [`EventSink`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   connect(url, protocols, sink)   ┌──────────────┐
//! │  ReconnectingClient  │──────────────────────────────────►│  Transport   │
//! │  (lifecycle task)    │                                   │              │
//! │                      │◄──── EventSink: Open/Message/ ────│  Handle      │
//! │                      │      Close/Error/SendFailed       │  send/close  │
//! └──────────────────────┘                                   └──────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::connect` - Start connecting, return a handle immediately
//! 2. `TransportEvent::Open` - Handshake complete
//! 3. `TransportHandle::send` - Queue outgoing text
//! 4. `TransportHandle::close` - Start the closing handshake
//! 5. `TransportEvent::Close` - Exactly once, last event of the connection
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `memory` | Scripted in-process transport |
//! | `sink` | Event sink and cancellable subscription |
//! | `tungstenite` | Network transport on tokio-tungstenite |

// ============================================================================
// Submodules
// ============================================================================

/// Scripted in-process transport.
pub mod memory;

/// Event delivery from transports to the client.
pub mod sink;

/// Network transport built on tokio-tungstenite.
pub mod tungstenite;

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};
use crate::protocol::CloseEvent;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryConnection, MemoryTransport};
pub use sink::{EventSink, Subscription};
pub use tungstenite::TungsteniteTransport;

// ============================================================================
// TransportEvent
// ============================================================================

/// Progress reported by a transport for one connection.
#[derive(Debug)]
pub enum TransportEvent {
    /// Opening handshake completed.
    Open,
    /// Text message received.
    Message(String),
    /// Connection closed. Must be the last event of a connection.
    Close(CloseEvent),
    /// Connection-level failure.
    Error(Error),
    /// An accepted send could not be written. Does not affect the connection.
    SendFailed(Error),
}

// ============================================================================
// Traits
// ============================================================================

/// Factory for transport connections.
///
/// Implementations must return without waiting for the handshake. Progress
/// is reported through the supplied [`EventSink`].
pub trait Transport: Send + Sync + 'static {
    /// Starts connecting to `url` offering `protocols`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot even be attempted. No
    /// events are emitted in that case.
    fn connect(
        &self,
        url: &Url,
        protocols: &[String],
        events: EventSink,
    ) -> Result<Box<dyn TransportHandle>>;
}

/// Handle to one transport connection.
pub trait TransportHandle: Send + 'static {
    /// Hands `text` to the transport for sending.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejected the message.
    fn send(&mut self, text: &str) -> Result<()>;

    /// Starts the closing handshake. The transport reports the final
    /// [`TransportEvent::Close`].
    ///
    /// # Errors
    ///
    /// Returns an error if the close request could not be delivered.
    fn close(&mut self) -> Result<()>;
}

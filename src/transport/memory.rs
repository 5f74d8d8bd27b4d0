//! Scripted in-process transport.
//!
//! [`MemoryTransport`] records every connect, send and close it receives and
//! lets the owner drive each connection by hand. Useful for tests and for
//! hosts that bridge the client onto their own socket implementation.
//!
//! # Example
//!
//! ```ignore
//! let transport = MemoryTransport::new();
//! let client = ReconnectingClient::builder()
//!     .url("ws://h/p")
//!     .transport(transport.clone())
//!     .auto_connect(true)
//!     .build()?;
//!
//! transport.wait_for_connections(1).await;
//! let connection = transport.last_connection().unwrap();
//! connection.open();
//! connection.close_with(1006, false, "");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::CloseEvent;

use super::{EventSink, Transport, TransportEvent, TransportHandle};

// ============================================================================
// MemoryTransport
// ============================================================================

/// Transport whose connections are driven by the caller.
///
/// Clones share the same recorded state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<MemoryState>,
}

/// State shared by all clones of a [`MemoryTransport`].
#[derive(Debug, Default)]
struct MemoryState {
    /// Every connection created, in order.
    connections: Mutex<Vec<MemoryConnection>>,
    /// Error message for the next connect attempt.
    connect_failure: Mutex<Option<String>>,
    /// Error message for sends while set.
    send_failure: Mutex<Option<String>>,
    /// Woken after each connect.
    connected: Notify,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many connections have been created.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.inner.connections.lock().len()
    }

    /// Returns the connection created by the `index`-th connect call.
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<MemoryConnection> {
        self.inner.connections.lock().get(index).cloned()
    }

    /// Returns the most recently created connection.
    #[must_use]
    pub fn last_connection(&self) -> Option<MemoryConnection> {
        self.inner.connections.lock().last().cloned()
    }

    /// Makes the next connect call fail synchronously with `message`.
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        *self.inner.connect_failure.lock() = Some(message.into());
    }

    /// Makes every send fail with `message` until cleared with `None`.
    pub fn fail_sends(&self, message: Option<String>) {
        *self.inner.send_failure.lock() = message;
    }

    /// Waits until at least `count` connections have been created.
    pub async fn wait_for_connections(&self, count: usize) {
        loop {
            let notified = self.inner.connected.notified();
            if self.connect_count() >= count {
                return;
            }
            notified.await;
        }
    }
}

impl Transport for MemoryTransport {
    fn connect(
        &self,
        url: &Url,
        protocols: &[String],
        events: EventSink,
    ) -> Result<Box<dyn TransportHandle>> {
        if let Some(message) = self.inner.connect_failure.lock().take() {
            return Err(Error::transport(message));
        }

        let connection = MemoryConnection {
            id: events.connection_id(),
            url: url.clone(),
            protocols: protocols.to_vec(),
            sink: events,
            sent: Arc::new(Mutex::new(Vec::new())),
            close_calls: Arc::new(AtomicUsize::new(0)),
        };

        trace!(connection_id = %connection.id, %url, "Memory connection created");

        self.inner.connections.lock().push(connection.clone());
        self.inner.connected.notify_waiters();

        Ok(Box::new(MemoryHandle {
            connection,
            transport: Arc::clone(&self.inner),
        }))
    }
}

// ============================================================================
// MemoryConnection
// ============================================================================

/// Caller-side view of one memory connection.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    id: ConnectionId,
    url: Url,
    protocols: Vec<String>,
    sink: EventSink,
    sent: Arc<Mutex<Vec<String>>>,
    close_calls: Arc<AtomicUsize>,
}

impl MemoryConnection {
    /// Returns the connection ID assigned by the client.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the URL passed to connect.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the subprotocols passed to connect.
    #[inline]
    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Returns every text handed to send, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Returns how many times close was called on the handle.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    /// Returns `true` while the client still listens to this connection.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.sink.is_attached()
    }

    /// Reports the opening handshake as complete.
    pub fn open(&self) -> bool {
        self.sink.emit(TransportEvent::Open)
    }

    /// Delivers an incoming text message.
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.sink.emit(TransportEvent::Message(text.into()))
    }

    /// Reports the connection as closed.
    pub fn close_with(&self, code: u16, was_clean: bool, reason: impl Into<String>) -> bool {
        self.sink
            .emit(TransportEvent::Close(CloseEvent::new(code, was_clean, reason)))
    }

    /// Reports a connection-level error.
    pub fn error(&self, err: Error) -> bool {
        self.sink.emit(TransportEvent::Error(err))
    }
}

// ============================================================================
// MemoryHandle
// ============================================================================

/// Handle given to the client.
///
/// Closing answers immediately with a clean normal close.
#[derive(Debug)]
struct MemoryHandle {
    connection: MemoryConnection,
    transport: Arc<MemoryState>,
}

impl TransportHandle for MemoryHandle {
    fn send(&mut self, text: &str) -> Result<()> {
        if let Some(message) = self.transport.send_failure.lock().clone() {
            return Err(Error::transport(message));
        }
        self.connection.sent.lock().push(text.to_owned());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.connection.close_calls.fetch_add(1, Ordering::AcqRel);
        self.connection
            .sink
            .emit(TransportEvent::Close(CloseEvent::normal()));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc;

    use crate::transport::Subscription;
    use crate::transport::sink::EventEnvelope;

    struct Connected {
        handle: Box<dyn TransportHandle>,
        rx: mpsc::UnboundedReceiver<EventEnvelope>,
        _subscription: Subscription,
    }

    fn connect(transport: &MemoryTransport) -> Connected {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, subscription) = EventSink::pair(ConnectionId::next(), tx);
        let url = Url::parse("ws://h/p").unwrap();
        let handle = transport.connect(&url, &["chat".into()], sink).unwrap();
        Connected {
            handle,
            rx,
            _subscription: subscription,
        }
    }

    #[test]
    fn test_connect_records_arguments() {
        let transport = MemoryTransport::new();
        let _connected = connect(&transport);

        assert_eq!(transport.connect_count(), 1);
        let connection = transport.last_connection().unwrap();
        assert_eq!(connection.url().as_str(), "ws://h/p");
        assert_eq!(connection.protocols(), ["chat".to_string()]);
    }

    #[test]
    fn test_send_and_close_are_recorded() {
        let transport = MemoryTransport::new();
        let mut connected = connect(&transport);

        connected.handle.send("\"hi\"").unwrap();
        connected.handle.close().unwrap();

        let connection = transport.connection(0).unwrap();
        assert_eq!(connection.sent(), vec!["\"hi\"".to_string()]);
        assert_eq!(connection.close_calls(), 1);

        let (_, event) = connected.rx.try_recv().unwrap();
        assert!(matches!(event, TransportEvent::Close(close) if close.is_normal()));
    }

    #[test]
    fn test_scripted_failures() {
        let transport = MemoryTransport::new();
        transport.fail_next_connect("no route");

        let (tx, _rx) = mpsc::unbounded_channel();
        let (sink, _subscription) = EventSink::pair(ConnectionId::next(), tx);
        let url = Url::parse("ws://h/p").unwrap();
        assert!(transport.connect(&url, &[], sink).is_err());
        assert_eq!(transport.connect_count(), 0);

        let mut connected = connect(&transport);
        transport.fail_sends(Some("broken pipe".into()));
        assert!(connected.handle.send("x").is_err());
        transport.fail_sends(None);
        assert!(connected.handle.send("x").is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_connections() {
        let transport = MemoryTransport::new();
        let waiter = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.wait_for_connections(1).await })
        };

        let _connected = connect(&transport);
        waiter.await.unwrap();
        assert_eq!(transport.connect_count(), 1);
    }
}

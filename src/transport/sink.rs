//! Event delivery from transports to the client.
//!
//! Each connection gets its own [`EventSink`] paired with a [`Subscription`].
//! Cancelling the subscription detaches the sink: later emits are dropped, so
//! a replaced connection can never deliver into the client again.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::trace;

use crate::identifiers::ConnectionId;

use super::TransportEvent;

// ============================================================================
// Types
// ============================================================================

/// Event tagged with the connection that produced it.
pub(crate) type EventEnvelope = (ConnectionId, TransportEvent);

// ============================================================================
// EventSink
// ============================================================================

/// Sending side of a connection's event stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    /// Connection this sink belongs to.
    connection_id: ConnectionId,
    /// Client event channel.
    tx: mpsc::UnboundedSender<EventEnvelope>,
    /// Cleared when the subscription is cancelled.
    attached: Arc<AtomicBool>,
}

impl EventSink {
    /// Creates a sink and the subscription that controls it.
    pub(crate) fn pair(
        connection_id: ConnectionId,
        tx: mpsc::UnboundedSender<EventEnvelope>,
    ) -> (Self, Subscription) {
        let attached = Arc::new(AtomicBool::new(true));
        let sink = Self {
            connection_id,
            tx,
            attached: Arc::clone(&attached),
        };
        let subscription = Subscription {
            connection_id,
            attached,
        };
        (sink, subscription)
    }

    /// Returns the connection this sink reports for.
    #[inline]
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Returns `true` while the client still listens to this connection.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Delivers an event to the client.
    ///
    /// Returns `false` if the event was dropped because the subscription was
    /// cancelled or the client is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        if !self.attached.load(Ordering::Acquire) {
            trace!(connection_id = %self.connection_id, ?event, "Dropping event for detached sink");
            return false;
        }
        self.tx.send((self.connection_id, event)).is_ok()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Cancellable binding between a connection and the client.
///
/// Cancelled on drop.
#[derive(Debug)]
pub struct Subscription {
    connection_id: ConnectionId,
    attached: Arc<AtomicBool>,
}

impl Subscription {
    /// Returns the connection this subscription controls.
    #[inline]
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Detaches the sink.
    pub fn cancel(&self) {
        if self.attached.swap(false, Ordering::AcqRel) {
            trace!(connection_id = %self.connection_id, "Subscription cancelled");
        }
    }

    /// Returns `true` until [`cancel`](Self::cancel) is called.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Connection lifecycle state machine.
//!
//! [`Lifecycle`] is the single writer of a client's state. It owns the live
//! transport handle, the reconnect scheduler and the audit trail, and is
//! driven by the client task one input at a time.
//!
//! # Transitions
//!
//! ```text
//! Unset ──open──► Connecting ──Open──► Open ──close──► Closing ──Close──► Closed
//!                     │                  │                                  ▲
//!                     └──────── Close (abnormal) ───────────────────────────┘
//! Closed ──open / reconnect──► Connecting
//! ```
//!
//! A close with any code other than 1000, and any error other than a refused
//! connection, schedules one reconnect when auto-reconnect is enabled. A close
//! that follows our own close request never does, whatever its code.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::Error;
use crate::identifiers::{ClientId, ConnectionId};
use crate::protocol::{
    ClientSnapshot, CloseEvent, ConnectionState, Notification, PayloadCodec,
};
use crate::transport::sink::EventEnvelope;
use crate::transport::{EventSink, Subscription, Transport, TransportEvent, TransportHandle};

use super::options::ClientConfig;
use super::reconnect::ReconnectScheduler;

// ============================================================================
// Constants
// ============================================================================

/// How long teardown waits for the transport to report the close.
pub(crate) const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Logging
// ============================================================================

/// Logs at `$level` when verbose, otherwise at debug.
macro_rules! lifecycle_log {
    ($verbose:expr, $level:ident, $($arg:tt)+) => {
        if $verbose {
            ::tracing::$level!($($arg)+);
        } else {
            ::tracing::debug!($($arg)+);
        }
    };
}

// ============================================================================
// LiveConnection
// ============================================================================

/// The connection currently owned by the client.
struct LiveConnection {
    /// Connection ID used to filter events.
    id: ConnectionId,
    /// Transport handle.
    handle: Box<dyn TransportHandle>,
    /// Event binding; cancelled on release.
    subscription: Subscription,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Client state machine.
pub(crate) struct Lifecycle {
    /// Owning client.
    client_id: ClientId,
    /// Current configuration.
    config: ClientConfig,
    /// Incoming payload codec.
    codec: PayloadCodec,
    /// Connection factory.
    transport: Arc<dyn Transport>,
    /// Sender cloned into each connection's sink.
    event_tx: mpsc::UnboundedSender<EventEnvelope>,
    /// Readiness state.
    state: ConnectionState,
    /// Present only while `state` is live.
    connection: Option<LiveConnection>,
    /// Pending reconnect.
    reconnect: ReconnectScheduler,
    /// Snapshot read by client handles.
    shared: Arc<RwLock<ClientSnapshot>>,
    /// Notification fan-out.
    notifier: broadcast::Sender<Notification>,
    /// Set once teardown starts.
    teardown_deadline: Option<Instant>,
}

impl Lifecycle {
    /// Creates an idle state machine in [`ConnectionState::Unset`].
    pub(crate) fn new(
        client_id: ClientId,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        event_tx: mpsc::UnboundedSender<EventEnvelope>,
        shared: Arc<RwLock<ClientSnapshot>>,
        notifier: broadcast::Sender<Notification>,
    ) -> Self {
        let codec = PayloadCodec::new(config.payload_encoding);
        let reconnect = ReconnectScheduler::new(config.reconnect_interval());

        Self {
            client_id,
            config,
            codec,
            transport,
            event_tx,
            state: ConnectionState::Unset,
            connection: None,
            reconnect,
            shared,
            notifier,
            teardown_deadline: None,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns the readiness state.
    #[inline]
    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the live connection's ID.
    #[inline]
    pub(crate) fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(|connection| connection.id)
    }

    /// Returns when the pending reconnect is due.
    #[inline]
    pub(crate) fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect.deadline()
    }

    /// Returns when teardown gives up waiting for the close.
    #[inline]
    pub(crate) fn teardown_deadline(&self) -> Option<Instant> {
        self.teardown_deadline
    }

    /// Returns `true` once teardown has started.
    #[inline]
    pub(crate) fn is_tearing_down(&self) -> bool {
        self.teardown_deadline.is_some()
    }

    /// Returns `true` once teardown has released the connection.
    #[inline]
    pub(crate) fn is_finished(&self) -> bool {
        self.is_tearing_down() && self.connection.is_none()
    }

    /// Label used in log fields.
    #[inline]
    fn label(&self) -> &str {
        self.config.label()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Connects unless a connection is already live.
    pub(crate) fn open(&mut self) {
        if self.is_tearing_down() {
            lifecycle_log!(self.config.verbose, warn, client = %self.label(), "Ignoring open during teardown");
            return;
        }

        if self.reconnect.cancel() {
            trace!(client = %self.label(), "Pending reconnect superseded by open");
        }

        if self.state.is_live() {
            debug!(client = %self.label(), state = %self.state, "Connection already live, reusing it");
            return;
        }

        self.connect();
    }

    /// Sends `data` as JSON text. A no-op unless the connection is open.
    pub(crate) fn send(&mut self, data: Value) {
        if !self.state.is_open() {
            lifecycle_log!(
                self.config.verbose,
                warn,
                client = %self.label(),
                state = %self.state,
                "WebSocket connection isn't open, message dropped"
            );
            return;
        }

        let text = match self.codec.encode(&data) {
            Ok(text) => text,
            Err(err) => {
                lifecycle_log!(self.config.verbose, error, client = %self.label(), error = %err, "Failed to encode message");
                self.report_error(err);
                return;
            }
        };

        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        let connection_id = connection.id;

        match connection.handle.send(&text) {
            Ok(()) => {
                trace!(client = %self.label(), %connection_id, len = text.len(), "Message sent");
                self.shared.write().audit.last_request = Some(text);
            }
            Err(err) => {
                lifecycle_log!(
                    self.config.verbose,
                    error,
                    client = %self.label(),
                    %connection_id,
                    error = %err,
                    "Failed to send message"
                );
                self.report_error(err);
            }
        }
    }

    /// Starts the closing handshake. A no-op unless the connection is open.
    ///
    /// Always cancels a pending reconnect.
    pub(crate) fn close(&mut self) {
        if self.reconnect.cancel() {
            trace!(client = %self.label(), "Pending reconnect cancelled by close");
        }

        if !self.state.is_open() {
            lifecycle_log!(
                self.config.verbose,
                warn,
                client = %self.label(),
                state = %self.state,
                "WebSocket connection isn't open, nothing to close"
            );
            return;
        }

        self.request_close();
    }

    /// Replaces the URL used by the next connection attempt.
    pub(crate) fn set_url(&mut self, url: String) {
        debug!(client = %self.label(), %url, "WebSocket url updated");
        self.config.url = Some(url);
    }

    /// Cancels any pending reconnect and closes a live connection.
    ///
    /// The client task keeps running until the close is observed or
    /// [`TEARDOWN_TIMEOUT`] passes.
    pub(crate) fn teardown(&mut self) {
        if self.is_tearing_down() {
            return;
        }

        self.teardown_deadline = Some(Instant::now() + TEARDOWN_TIMEOUT);
        self.reconnect.cancel();

        debug!(client = %self.client_id, state = %self.state, "Teardown started");

        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
            self.request_close();
        }
    }

    /// Releases the connection after teardown timed out.
    pub(crate) fn abandon(&mut self) {
        if self.connection.is_none() {
            return;
        }

        lifecycle_log!(
            self.config.verbose,
            warn,
            client = %self.label(),
            "Transport did not report close, releasing connection"
        );

        self.finish_close(CloseEvent::abnormal("teardown timed out"));
    }

    /// Runs a due reconnect.
    pub(crate) fn reconnect_due(&mut self) {
        if !self.reconnect.fire() || self.is_tearing_down() {
            return;
        }

        if self.state.is_live() {
            debug!(client = %self.label(), state = %self.state, "Reconnect skipped, connection already live");
            return;
        }

        lifecycle_log!(
            self.config.verbose,
            info,
            client = %self.label(),
            url = ?self.config.url,
            "Reconnecting WebSocket"
        );

        self.connect();
    }

    // ========================================================================
    // Transport Events
    // ========================================================================

    /// Applies an event from the transport.
    ///
    /// Events from any connection but the live one are discarded.
    pub(crate) fn handle_event(&mut self, connection_id: ConnectionId, event: TransportEvent) {
        if self.connection_id() != Some(connection_id) {
            trace!(client = %self.label(), %connection_id, ?event, "Discarding event from replaced connection");
            return;
        }

        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Close(close) => self.on_close(close),
            TransportEvent::Error(err) => self.on_error(err),
            TransportEvent::SendFailed(err) => {
                lifecycle_log!(
                    self.config.verbose,
                    error,
                    client = %self.label(),
                    %connection_id,
                    error = %err,
                    "Failed to send message"
                );
                self.report_error(err);
            }
        }
    }

    fn on_open(&mut self) {
        self.set_state(ConnectionState::Open);

        lifecycle_log!(
            self.config.verbose,
            info,
            client = %self.label(),
            url = ?self.config.url,
            "WebSocket established"
        );

        self.notify(Notification::Opened);
    }

    fn on_message(&mut self, text: &str) {
        trace!(client = %self.label(), len = text.len(), "WebSocket received message");

        match self.codec.decode(text) {
            Ok(payload) => {
                self.shared.write().audit.last_response = Some(payload.clone());
                self.notify(Notification::Message { payload });
            }
            Err(err) => {
                lifecycle_log!(self.config.verbose, error, client = %self.label(), error = %err, "Failed to decode message");
                self.report_error(err);
            }
        }
    }

    fn on_close(&mut self, close: CloseEvent) {
        let requested = self.state == ConnectionState::Closing;
        let abnormal = close.is_abnormal();
        self.finish_close(close);

        if abnormal && !requested {
            self.schedule_reconnect();
        } else if abnormal {
            debug!(client = %self.label(), "Close was requested, not reconnecting");
        }
    }

    fn on_error(&mut self, err: Error) {
        let refused = err.is_connection_refused();

        lifecycle_log!(
            self.config.verbose,
            error,
            client = %self.label(),
            url = ?self.config.url,
            error = %err,
            "WebSocket returned error"
        );

        self.report_error(err);

        if !refused {
            self.schedule_reconnect();
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Creates a connection and enters [`ConnectionState::Connecting`].
    fn connect(&mut self) {
        let url = match self.config.parsed_url() {
            Ok(url) => url,
            Err(err) => {
                lifecycle_log!(
                    self.config.verbose,
                    error,
                    client = %self.label(),
                    url = ?self.config.url,
                    "Please provide a valid WebSocket url"
                );
                self.report_error(err);
                return;
            }
        };

        let connection_id = ConnectionId::next();
        let (sink, subscription) = EventSink::pair(connection_id, self.event_tx.clone());

        match self.transport.connect(&url, &self.config.protocols, sink) {
            Ok(handle) => {
                self.connection = Some(LiveConnection {
                    id: connection_id,
                    handle,
                    subscription,
                });
                self.set_state(ConnectionState::Connecting);
                debug!(client = %self.label(), %connection_id, %url, "WebSocket connecting");
            }
            Err(err) => {
                lifecycle_log!(
                    self.config.verbose,
                    error,
                    client = %self.label(),
                    %url,
                    error = %err,
                    "Establishing WebSocket connection failed"
                );
                self.report_error(err);
            }
        }
    }

    /// Asks the transport to close and enters [`ConnectionState::Closing`].
    fn request_close(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };

        match connection.handle.close() {
            Ok(()) => self.set_state(ConnectionState::Closing),
            Err(err) => {
                lifecycle_log!(self.config.verbose, error, client = %self.label(), error = %err, "Failed to close WebSocket");
                self.report_error(err);
            }
        }
    }

    /// Releases the connection, enters [`ConnectionState::Closed`] and
    /// publishes the close.
    fn finish_close(&mut self, close: CloseEvent) {
        if let Some(connection) = self.connection.take() {
            connection.subscription.cancel();
        }

        self.set_state(ConnectionState::Closed);

        if close.was_clean {
            lifecycle_log!(
                self.config.verbose,
                info,
                client = %self.label(),
                code = close.code,
                "WebSocket closed"
            );
        } else {
            lifecycle_log!(
                self.config.verbose,
                warn,
                client = %self.label(),
                code = close.code,
                reason = %close.reason,
                "WebSocket was closed"
            );
        }

        self.notify(Notification::Closed {
            clean: close.was_clean,
            code: close.code,
            reason: close.reason,
        });
    }

    /// Arms the reconnect timer if enabled and not already armed.
    fn schedule_reconnect(&mut self) {
        if !self.config.auto_reconnect || self.is_tearing_down() {
            return;
        }

        if self.reconnect.schedule() {
            lifecycle_log!(
                self.config.verbose,
                info,
                client = %self.label(),
                delay_ms = u64::try_from(self.reconnect.interval().as_millis()).unwrap_or(u64::MAX),
                "Reconnect scheduled"
            );
        } else {
            trace!(client = %self.label(), "Reconnect already pending");
        }
    }

    /// Records an error and publishes it. Callers log.
    fn report_error(&mut self, err: Error) {
        let detail = err.detail();
        self.shared.write().audit.last_error = Some(detail.clone());
        self.notify(Notification::ErrorOccurred { detail });
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }

        trace!(client = %self.label(), from = %self.state, to = %state, "State changed");

        self.state = state;
        self.shared.write().state = state;
        self.notify(Notification::StateChanged { state });
    }

    fn notify(&self, notification: Notification) {
        // No receivers is fine.
        let _ = self.notifier.send(notification);
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Network transport built on tokio-tungstenite.
//!
//! Each connection spawns a tokio task that handles:
//!
//! - The opening handshake (with timeout)
//! - Incoming frames, reported as [`TransportEvent`]s
//! - Outgoing text and close requests from the handle
//! - The closing handshake (with timeout)
//!
//! The task always finishes by emitting exactly one [`TransportEvent::Close`].

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::CloseEvent;
use crate::protocol::close::NO_STATUS_RECEIVED;

use super::{EventSink, Transport, TransportEvent, TransportHandle};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the opening handshake.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the peer to answer our close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SocketCommand
// ============================================================================

/// Internal commands for the socket task.
#[derive(Debug)]
enum SocketCommand {
    /// Send a text frame.
    Send(String),
    /// Start the closing handshake.
    Close,
}

// ============================================================================
// TungsteniteTransport
// ============================================================================

/// Transport that opens real WebSocket connections.
///
/// Must be used from within a Tokio runtime.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use reconnecting_websocket::{ReconnectingClient, TungsteniteTransport};
///
/// let client = ReconnectingClient::builder()
///     .url("ws://127.0.0.1:9001/feed")
///     .transport(TungsteniteTransport::new().with_connect_timeout(Duration::from_secs(5)))
///     .build()?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TungsteniteTransport {
    /// Maximum time for the opening handshake.
    connect_timeout: Duration,
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TungsteniteTransport {
    /// Creates a transport with the default connect timeout (30s).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the opening handshake timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Returns the opening handshake timeout.
    #[inline]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Transport for TungsteniteTransport {
    fn connect(
        &self,
        url: &Url,
        protocols: &[String],
        events: EventSink,
    ) -> Result<Box<dyn TransportHandle>> {
        if url.scheme() == "wss" {
            return Err(Error::config(format!(
                "Cannot connect to '{url}': wss needs TLS support, which this transport is built without"
            )));
        }

        let request = build_request(url, protocols)?;
        let connection_id = events.connection_id();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(
            request,
            command_rx,
            events,
            self.connect_timeout,
        ));

        debug!(%connection_id, %url, "Socket task spawned");

        Ok(Box::new(TungsteniteHandle {
            connection_id,
            command_tx,
        }))
    }
}

// ============================================================================
// TungsteniteHandle
// ============================================================================

/// Handle to a socket task.
#[derive(Debug)]
struct TungsteniteHandle {
    /// Connection this handle controls.
    connection_id: ConnectionId,
    /// Channel for sending commands to the socket task.
    command_tx: mpsc::UnboundedSender<SocketCommand>,
}

impl TransportHandle for TungsteniteHandle {
    fn send(&mut self, text: &str) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Send(text.to_owned()))
            .map_err(|_| {
                Error::transport(format!("socket task for {} has ended", self.connection_id))
            })
    }

    fn close(&mut self) -> Result<()> {
        self.command_tx.send(SocketCommand::Close).map_err(|_| {
            Error::transport(format!("socket task for {} has ended", self.connection_id))
        })
    }
}

// ============================================================================
// Request Construction
// ============================================================================

/// Builds the handshake request, offering `protocols` as subprotocols.
fn build_request(url: &Url, protocols: &[String]) -> Result<Request> {
    let mut request = url.as_str().into_client_request()?;

    if !protocols.is_empty() {
        let value = HeaderValue::from_str(&protocols.join(", "))
            .map_err(|e| Error::config(format!("Invalid subprotocol list: {e}")))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(request)
}

/// Maps a handshake failure, separating refused connections.
fn classify_connect_error(err: WsError) -> Error {
    match err {
        WsError::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            Error::connection_refused(io.to_string())
        }
        other => Error::WebSocket(other),
    }
}

/// Converts a received close frame into a close event.
fn close_event_from(frame: Option<CloseFrame>) -> CloseEvent {
    match frame {
        Some(frame) => CloseEvent::new(u16::from(frame.code), true, frame.reason.as_str()),
        None => CloseEvent::new(NO_STATUS_RECEIVED, true, ""),
    }
}

// ============================================================================
// Socket Task
// ============================================================================

/// Drives one connection from handshake to close.
async fn run_socket(
    request: Request,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    events: EventSink,
    connect_timeout: Duration,
) {
    let connection_id = events.connection_id();

    let connect = timeout(connect_timeout, connect_async(request));
    tokio::pin!(connect);

    let ws_stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(Ok((stream, _response))) => break stream,
                Ok(Err(e)) => {
                    let err = classify_connect_error(e);
                    debug!(%connection_id, error = %err, "WebSocket handshake failed");
                    events.emit(TransportEvent::Error(err));
                    events.emit(TransportEvent::Close(CloseEvent::abnormal("")));
                    return;
                }
                Err(_) => {
                    let timeout_ms = u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX);
                    debug!(%connection_id, timeout_ms, "WebSocket handshake timed out");
                    events.emit(TransportEvent::Error(Error::connection_timeout(timeout_ms)));
                    events.emit(TransportEvent::Close(CloseEvent::abnormal("")));
                    return;
                }
            },

            command = command_rx.recv() => match command {
                Some(SocketCommand::Send(_)) => {
                    warn!(%connection_id, "Dropping send issued before handshake completed");
                }
                Some(SocketCommand::Close) | None => {
                    debug!(%connection_id, "Connection closed before handshake completed");
                    events.emit(TransportEvent::Close(CloseEvent::abnormal(
                        "closed before the connection was established",
                    )));
                    return;
                }
            },
        }
    };

    events.emit(TransportEvent::Open);
    trace!(%connection_id, "WebSocket open");

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut close_deadline: Option<Instant> = None;

    let close_event = loop {
        tokio::select! {
            message = ws_read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    events.emit(TransportEvent::Message(text.as_str().to_owned()));
                }

                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        events.emit(TransportEvent::Message(text));
                    }
                    Err(_) => {
                        warn!(%connection_id, len = bytes.len(), "Ignoring non UTF-8 binary frame");
                    }
                },

                Some(Ok(Message::Close(frame))) => {
                    debug!(%connection_id, ?frame, "Close frame received");
                    break close_event_from(frame);
                }

                Some(Err(e)) => {
                    error!(%connection_id, error = %e, "WebSocket error");
                    events.emit(TransportEvent::Error(Error::WebSocket(e)));
                    break CloseEvent::abnormal("");
                }

                None => {
                    debug!(%connection_id, "WebSocket stream ended");
                    break CloseEvent::abnormal("");
                }

                // Ignore Ping, Pong, raw Frame
                Some(Ok(_)) => {}
            },

            command = command_rx.recv(), if close_deadline.is_none() => match command {
                Some(SocketCommand::Send(text)) => {
                    if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                        warn!(%connection_id, error = %e, "Failed to send message");
                        events.emit(TransportEvent::SendFailed(Error::WebSocket(e)));
                    }
                }

                Some(SocketCommand::Close) | None => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    };
                    if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                        warn!(%connection_id, error = %e, "Failed to send close frame");
                        break CloseEvent::abnormal(e.to_string());
                    }
                    close_deadline = Some(Instant::now() + CLOSE_HANDSHAKE_TIMEOUT);
                }
            },

            _ = sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
                warn!(%connection_id, "Peer did not answer close frame");
                break CloseEvent::abnormal("closing handshake timed out");
            }
        }
    };

    let _ = ws_write.close().await;
    events.emit(TransportEvent::Close(close_event));

    debug!(%connection_id, "Socket task terminated");
}

// ============================================================================
// Tests
// ============================================================================

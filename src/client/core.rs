//! Reconnecting client handle and its event loop.
//!
//! The [`ReconnectingClient`] is a cheap, cloneable handle. All work happens
//! in one spawned task that owns the lifecycle state machine and serializes:
//!
//! - Commands from handles (open, send, close, set url, shutdown)
//! - Events from the live transport connection
//! - The reconnect deadline
//! - The teardown deadline
//!
//! # Example
//!
//! ```no_run
//! use reconnecting_websocket::{Notification, ReconnectingClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = ReconnectingClient::builder()
//!     .url("ws://127.0.0.1:9001/feed")
//!     .auto_connect(true)
//!     .build()?;
//!
//! let mut notifications = client.subscribe();
//! while let Ok(notification) = notifications.recv().await {
//!     if notification == Notification::Opened {
//!         client.send(&serde_json::json!({ "op": "subscribe" }))?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::error::{Error, ErrorDetail, Result};
use crate::identifiers::ClientId;
use crate::protocol::{AuditTrail, ClientSnapshot, ConnectionState, Notification, Payload};
use crate::transport::Transport;
use crate::transport::sink::EventEnvelope;

use super::builder::ClientBuilder;
use super::lifecycle::Lifecycle;
use super::options::ClientConfig;

// ============================================================================
// Constants
// ============================================================================

/// Notifications buffered per subscriber before the oldest are dropped.
const NOTIFICATION_CAPACITY: usize = 256;

// ============================================================================
// ClientCommand
// ============================================================================

/// Internal commands for the client task.
#[derive(Debug)]
enum ClientCommand {
    /// Connect unless already connected.
    Open,
    /// Send a JSON value.
    Send(Value),
    /// Close the open connection.
    Close,
    /// Replace the URL for the next connection.
    SetUrl(String),
    /// Tear the client down.
    Shutdown,
}

// ============================================================================
// Types
// ============================================================================

/// State shared by all handles of one client.
struct ClientInner {
    /// Client ID.
    id: ClientId,
    /// Log label.
    label: String,
    /// Channel for sending commands to the client task.
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    /// Snapshot written by the client task.
    shared: Arc<RwLock<ClientSnapshot>>,
    /// Notification fan-out.
    notifier: broadcast::Sender<Notification>,
}

// ============================================================================
// ReconnectingClient
// ============================================================================

/// WebSocket client with an observable lifecycle and fixed-interval
/// auto-reconnect.
///
/// Handle methods never wait on the network. Outcomes are reported through
/// [`subscribe`](Self::subscribe) and [`snapshot`](Self::snapshot).
///
/// Dropping the last handle tears the client down.
#[derive(Clone)]
pub struct ReconnectingClient {
    inner: Arc<ClientInner>,
}

// ============================================================================
// ReconnectingClient - Display
// ============================================================================

impl fmt::Debug for ReconnectingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectingClient")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ReconnectingClient - Construction
// ============================================================================

impl ReconnectingClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Spawns the client task on `runtime`.
    pub(crate) fn spawn(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        runtime: &Handle,
    ) -> Self {
        let id = ClientId::new();
        let label = config.label().to_owned();
        let auto_connect = config.auto_connect;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let shared = Arc::new(RwLock::new(ClientSnapshot::default()));

        let lifecycle = Lifecycle::new(
            id,
            config,
            transport,
            event_tx,
            Arc::clone(&shared),
            notifier.clone(),
        );

        if auto_connect {
            // Queued ahead of anything the caller sends.
            let _ = command_tx.send(ClientCommand::Open);
        }

        runtime.spawn(run_client(lifecycle, command_rx, event_rx));

        debug!(client = %label, %id, auto_connect, "Client task spawned");

        Self {
            inner: Arc::new(ClientInner {
                id,
                label,
                command_tx,
                shared,
                notifier,
            }),
        }
    }
}

// ============================================================================
// ReconnectingClient - Commands
// ============================================================================

impl ReconnectingClient {
    /// Opens a connection unless one is already live.
    ///
    /// A missing or invalid URL is reported as an
    /// [`ErrorOccurred`](Notification::ErrorOccurred) notification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientClosed`] if the client task has ended.
    pub fn open(&self) -> Result<()> {
        self.command(ClientCommand::Open)
    }

    /// Sends `data` serialized as JSON.
    ///
    /// Dropped with a log line unless the connection is open. Transport
    /// failures are reported as notifications, not returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if `data` cannot be serialized
    /// - [`Error::ClientClosed`] if the client task has ended
    pub fn send<T: Serialize + ?Sized>(&self, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.command(ClientCommand::Send(value))
    }

    /// Closes the open connection and cancels any pending reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientClosed`] if the client task has ended.
    pub fn close(&self) -> Result<()> {
        self.command(ClientCommand::Close)
    }

    /// Replaces the URL used by the next connection attempt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientClosed`] if the client task has ended.
    pub fn set_url(&self, url: impl Into<String>) -> Result<()> {
        self.command(ClientCommand::SetUrl(url.into()))
    }

    /// Tears the client down without waiting.
    ///
    /// Pending reconnects are cancelled and a live connection is closed. Use
    /// [`terminated`](Self::terminated) to wait for the task to finish.
    pub fn shutdown(&self) {
        let _ = self.inner.command_tx.send(ClientCommand::Shutdown);
    }

    /// Waits until the client task has finished.
    pub async fn terminated(&self) {
        self.inner.command_tx.closed().await;
    }

    fn command(&self, command: ClientCommand) -> Result<()> {
        self.inner
            .command_tx
            .send(command)
            .map_err(|_| Error::ClientClosed)
    }
}

// ============================================================================
// ReconnectingClient - Observation
// ============================================================================

impl ReconnectingClient {
    /// Returns the client ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.inner.id
    }

    /// Returns the log label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Returns `true` until the client task has finished.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.inner.command_tx.is_closed()
    }

    /// Subscribes to lifecycle notifications from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifier.subscribe()
    }

    /// Returns a copy of the current state and audit trail.
    #[must_use]
    pub fn snapshot(&self) -> ClientSnapshot {
        self.inner.shared.read().clone()
    }

    /// Returns the readiness state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.read().state
    }

    /// Returns a copy of the audit trail.
    #[must_use]
    pub fn audit(&self) -> AuditTrail {
        self.inner.shared.read().audit.clone()
    }

    /// Returns the wire text of the last successful send.
    #[must_use]
    pub fn last_request(&self) -> Option<String> {
        self.inner.shared.read().audit.last_request.clone()
    }

    /// Returns the last decoded incoming message.
    #[must_use]
    pub fn last_response(&self) -> Option<Payload> {
        self.inner.shared.read().audit.last_response.clone()
    }

    /// Returns the last reported error.
    #[must_use]
    pub fn last_error(&self) -> Option<ErrorDetail> {
        self.inner.shared.read().audit.last_error.clone()
    }
}

// ============================================================================
// Client Task
// ============================================================================

/// Event loop that owns the lifecycle.
async fn run_client(
    mut lifecycle: Lifecycle,
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    mut event_rx: mpsc::UnboundedReceiver<EventEnvelope>,
) {
    let mut handles_alive = true;

    loop {
        let reconnect_at = lifecycle.reconnect_deadline();
        let teardown_at = lifecycle.teardown_deadline();

        tokio::select! {
            command = command_rx.recv(), if handles_alive => match command {
                Some(ClientCommand::Open) => lifecycle.open(),
                Some(ClientCommand::Send(value)) => lifecycle.send(value),
                Some(ClientCommand::Close) => lifecycle.close(),
                Some(ClientCommand::SetUrl(url)) => lifecycle.set_url(url),
                Some(ClientCommand::Shutdown) => lifecycle.teardown(),
                None => {
                    debug!("All client handles dropped");
                    handles_alive = false;
                    lifecycle.teardown();
                }
            },

            Some((connection_id, event)) = event_rx.recv() => {
                lifecycle.handle_event(connection_id, event);
            }

            _ = sleep_until(reconnect_at.unwrap_or_else(Instant::now)), if reconnect_at.is_some() => {
                lifecycle.reconnect_due();
            }

            _ = sleep_until(teardown_at.unwrap_or_else(Instant::now)), if teardown_at.is_some() => {
                lifecycle.abandon();
            }

            else => break,
        }

        if lifecycle.is_finished() {
            break;
        }
    }

    debug!(state = %lifecycle.state(), "Client task terminated");
}

// ============================================================================
// Tests
// ============================================================================

//! Shared helpers for integration tests.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reconnecting_websocket::Notification;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for waiting on a single notification.
pub const WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// Logging
// ============================================================================

/// Routes crate logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Notifications
// ============================================================================

/// Receives notifications until one matches `predicate`.
///
/// Panics if none arrives within [`WAIT`].
pub async fn next_matching<F>(
    notifications: &mut broadcast::Receiver<Notification>,
    mut predicate: F,
) -> Notification
where
    F: FnMut(&Notification) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let notification = notifications.recv().await.expect("notification channel");
            if predicate(&notification) {
                return notification;
            }
        }
    })
    .await
    .expect("timed out waiting for notification")
}

/// Waits for the `Opened` notification.
pub async fn opened(notifications: &mut broadcast::Receiver<Notification>) {
    next_matching(notifications, |n| *n == Notification::Opened).await;
}

/// Waits for the next `Closed` notification.
pub async fn closed(notifications: &mut broadcast::Receiver<Notification>) -> Notification {
    next_matching(notifications, |n| matches!(n, Notification::Closed { .. })).await
}

// ============================================================================
// Echo Server
// ============================================================================

/// How the loopback server treats each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Echo every text frame back.
    Echo,
    /// Close with 1001 right after the handshake.
    GoAway,
    /// Complete the handshake, then never read or answer.
    Mute,
}

/// Starts a loopback WebSocket server and returns its `ws://` URL.
///
/// The first offered subprotocol is accepted.
pub async fn spawn_server(mode: ServerMode) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let callback = |request: &Request,
                                mut response: Response|
                 -> Result<Response, ErrorResponse> {
                    if let Some(offered) = request.headers().get(SEC_WEBSOCKET_PROTOCOL) {
                        let first = offered
                            .to_str()
                            .unwrap_or_default()
                            .split(',')
                            .next()
                            .unwrap_or_default()
                            .trim()
                            .to_string();
                        if let Ok(value) = HeaderValue::from_str(&first) {
                            response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                        }
                    }
                    Ok(response)
                };

                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    return;
                };

                match mode {
                    ServerMode::Echo => {
                        while let Some(Ok(message)) = ws.next().await {
                            match message {
                                Message::Text(text) => {
                                    if ws.send(Message::Text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                // Keep reading so the close reply is flushed.
                                _ => {}
                            }
                        }
                    }
                    ServerMode::GoAway => {
                        let frame = CloseFrame {
                            code: CloseCode::Away,
                            reason: "maintenance".into(),
                        };
                        let _ = ws.close(Some(frame)).await;
                        while let Some(Ok(_)) = ws.next().await {}
                    }
                    ServerMode::Mute => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        drop(ws);
                    }
                }
            });
        }
    });

    format!("ws://{addr}/echo")
}

/// Returns an address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr")
}

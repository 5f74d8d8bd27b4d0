//! End-to-end client behaviour over the memory transport.
//!
//! Time is paused so reconnect intervals elapse deterministically.

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reconnecting_websocket::{
    ConnectionState, ErrorKind, MemoryTransport, Notification, Payload, PayloadEncoding,
    ReconnectingClient,
};
use serde_json::json;
use tokio::time::Instant;

use common::{closed, init_tracing, next_matching, opened};

// ============================================================================
// Helpers
// ============================================================================

fn client(transport: &MemoryTransport) -> ReconnectingClient {
    init_tracing();
    ReconnectingClient::builder()
        .url("ws://h/p")
        .reconnect_interval(Duration::from_millis(1000))
        .transport(transport.clone())
        .build()
        .expect("client")
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test(start_paused = true)]
async fn abnormal_close_reconnects_once_after_interval() {
    let transport = MemoryTransport::new();
    let client = client(&transport);
    let mut notifications = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    let first = transport.connection(0).unwrap();

    let closed_at = Instant::now();
    first.close_with(1006, false, "");

    assert_eq!(
        closed(&mut notifications).await,
        Notification::Closed {
            clean: false,
            code: 1006,
            reason: String::new(),
        }
    );

    transport.wait_for_connections(2).await;
    let elapsed = closed_at.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1001), "{elapsed:?}");

    let second = transport.connection(1).unwrap();
    assert_eq!(second.url().as_str(), "ws://h/p");
    assert!(!first.is_attached());
    assert!(second.is_attached());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.connect_count(), 2);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn retries_forever_at_fixed_interval() {
    let transport = MemoryTransport::new();
    let client = client(&transport);

    client.open().unwrap();
    for attempt in 1..=4 {
        transport.wait_for_connections(attempt).await;
        let started = Instant::now();
        transport
            .last_connection()
            .unwrap()
            .close_with(1006, false, "");

        transport.wait_for_connections(attempt + 1).await;
        assert!(started.elapsed() < Duration::from_millis(1001));
    }

    assert_eq!(transport.connect_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn no_reconnect_when_disabled() {
    let transport = MemoryTransport::new();
    let client = ReconnectingClient::builder()
        .url("ws://h/p")
        .auto_reconnect(false)
        .transport(transport.clone())
        .build()
        .unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    let connection = transport.last_connection().unwrap();
    connection.open();
    opened(&mut notifications).await;

    connection.close_with(1006, false, "");
    closed(&mut notifications).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_reconnect() {
    let transport = MemoryTransport::new();
    let client = client(&transport);
    let mut notifications = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    transport
        .last_connection()
        .unwrap()
        .close_with(1006, false, "");
    closed(&mut notifications).await;

    client.close().unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.connect_count(), 1);
}

// ============================================================================
// Open / Send / Close
// ============================================================================

#[tokio::test(start_paused = true)]
async fn open_twice_reuses_connection() {
    let transport = MemoryTransport::new();
    let client = client(&transport);
    let mut notifications = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    transport.last_connection().unwrap().open();
    opened(&mut notifications).await;

    client.open().unwrap();
    client.open().unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn send_before_open_makes_no_transport_call() {
    let transport = MemoryTransport::new();
    let client = client(&transport);

    client.send(&json!({ "op": "early" })).unwrap();
    client.open().unwrap();
    transport.wait_for_connections(1).await;
    client.send(&json!({ "op": "connecting" })).unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(transport.last_connection().unwrap().sent().is_empty());
    assert_eq!(client.state(), ConnectionState::Connecting);
    assert!(client.last_request().is_none());
}

#[tokio::test(start_paused = true)]
async fn close_when_open_calls_transport_once() {
    let transport = MemoryTransport::new();
    let client = client(&transport);
    let mut notifications = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    let connection = transport.last_connection().unwrap();
    connection.open();
    opened(&mut notifications).await;

    client.send(&json!({ "op": "ping" })).unwrap();
    client.close().unwrap();

    assert_eq!(
        closed(&mut notifications).await,
        Notification::Closed {
            clean: true,
            code: 1000,
            reason: String::new(),
        }
    );
    assert_eq!(connection.close_calls(), 1);
    assert_eq!(connection.sent(), vec![r#"{"op":"ping"}"#.to_string()]);
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(client.last_request().as_deref(), Some(r#"{"op":"ping"}"#));

    client.close().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(connection.close_calls(), 1);
    assert_eq!(transport.connect_count(), 1);
}

// ============================================================================
// Payloads
// ============================================================================

#[tokio::test(start_paused = true)]
async fn malformed_json_reports_decode_error() {
    let transport = MemoryTransport::new();
    let client = ReconnectingClient::builder()
        .url("ws://h/p")
        .payload_encoding(PayloadEncoding::Json)
        .transport(transport.clone())
        .build()
        .unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    let connection = transport.last_connection().unwrap();
    connection.open();
    opened(&mut notifications).await;

    connection.message(r#"{"price":10}"#);
    next_matching(&mut notifications, |n| {
        matches!(n, Notification::Message { .. })
    })
    .await;

    connection.message("{price:");
    let notification = next_matching(&mut notifications, |n| {
        matches!(n, Notification::ErrorOccurred { .. })
    })
    .await;

    let Notification::ErrorOccurred { detail } = notification else {
        unreachable!();
    };
    assert_eq!(detail.kind, ErrorKind::Decode);
    assert_eq!(
        client.last_response(),
        Some(Payload::Json(json!({ "price": 10 })))
    );
    assert_eq!(client.last_error().map(|e| e.kind), Some(ErrorKind::Decode));
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn missing_url_reports_config_error() {
    let transport = MemoryTransport::new();
    let client = ReconnectingClient::builder()
        .transport(transport.clone())
        .build()
        .unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();

    let notification = next_matching(&mut notifications, |n| {
        matches!(n, Notification::ErrorOccurred { .. })
    })
    .await;
    assert!(matches!(
        notification,
        Notification::ErrorOccurred { detail } if detail.kind == ErrorKind::Config
    ));
    assert_eq!(transport.connect_count(), 0);
    assert_eq!(client.state(), ConnectionState::Unset);

    client.set_url("ws://h/p").unwrap();
    client.open().unwrap();
    transport.wait_for_connections(1).await;
}

// ============================================================================
// Construction / Teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn auto_connect_opens_on_build() {
    let transport = MemoryTransport::new();
    let _client = ReconnectingClient::builder()
        .url("ws://h/p")
        .protocol("chat")
        .auto_connect(true)
        .transport(transport.clone())
        .build()
        .unwrap();

    transport.wait_for_connections(1).await;
    assert_eq!(transport.last_connection().unwrap().protocols(), ["chat"]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_connection_and_terminates() {
    let transport = MemoryTransport::new();
    let client = client(&transport);
    let mut notifications = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    let connection = transport.last_connection().unwrap();
    connection.open();
    opened(&mut notifications).await;

    client.shutdown();
    client.terminated().await;

    assert!(!client.is_running());
    assert_eq!(connection.close_calls(), 1);
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(client.open().is_err());
}

#[tokio::test(start_paused = true)]
async fn dropping_last_handle_tears_down() {
    let transport = MemoryTransport::new();
    let client = client(&transport);
    let observer = client.subscribe();

    client.open().unwrap();
    transport.wait_for_connections(1).await;
    let connection = transport.last_connection().unwrap();
    connection.open();

    drop(client);
    drop(observer);

    tokio::time::timeout(Duration::from_secs(10), async {
        while connection.is_attached() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection released");

    assert_eq!(connection.close_calls(), 1);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.connect_count(), 1);
}

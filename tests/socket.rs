//! Client behaviour against a loopback WebSocket server.

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reconnecting_websocket::{
    ConnectionState, ErrorKind, Notification, Payload, PayloadEncoding, ReconnectingClient,
    TungsteniteTransport,
};
use serde_json::json;

use common::{
    ServerMode, closed, init_tracing, next_matching, opened, spawn_server, unused_addr,
};

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn json_echo_round_trip() {
    init_tracing();
    let url = spawn_server(ServerMode::Echo).await;
    let client = ReconnectingClient::builder()
        .url(url)
        .protocol("chat")
        .payload_encoding(PayloadEncoding::Json)
        .build()
        .unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();
    opened(&mut notifications).await;
    assert_eq!(client.state(), ConnectionState::Open);

    let data = json!({ "op": "quote", "symbols": ["A", "B"], "depth": 3, "live": true, "note": null });
    client.send(&data).unwrap();

    let notification = next_matching(&mut notifications, |n| {
        matches!(n, Notification::Message { .. })
    })
    .await;
    assert_eq!(
        notification,
        Notification::Message {
            payload: Payload::Json(data.clone())
        }
    );
    assert_eq!(client.last_response(), Some(Payload::Json(data.clone())));
    assert_eq!(
        client.last_request(),
        Some(serde_json::to_string(&data).unwrap())
    );

    client.shutdown();
    client.terminated().await;
}

#[tokio::test]
async fn raw_echo_passes_text_through() {
    init_tracing();
    let url = spawn_server(ServerMode::Echo).await;
    let client = ReconnectingClient::builder().url(url).build().unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();
    opened(&mut notifications).await;

    client.send("plain text").unwrap();

    let notification = next_matching(&mut notifications, |n| {
        matches!(n, Notification::Message { .. })
    })
    .await;
    // The wire text of a JSON string keeps its quotes in raw mode.
    assert_eq!(
        notification,
        Notification::Message {
            payload: Payload::Text("\"plain text\"".into())
        }
    );
}

#[tokio::test]
async fn client_close_is_clean() {
    init_tracing();
    let url = spawn_server(ServerMode::Echo).await;
    let client = ReconnectingClient::builder().url(url).build().unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();
    opened(&mut notifications).await;

    client.close().unwrap();
    assert_eq!(
        closed(&mut notifications).await,
        Notification::Closed {
            clean: true,
            code: 1000,
            reason: String::new(),
        }
    );
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn refused_connection_reports_error_then_abnormal_close() {
    init_tracing();
    let addr = unused_addr().await;
    let client = ReconnectingClient::builder()
        .url(format!("ws://{addr}/"))
        .auto_reconnect(false)
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
        Notification::ErrorOccurred { detail } if detail.kind == ErrorKind::ConnectionRefused
    ));

    let Notification::Closed { clean, code, .. } = closed(&mut notifications).await else {
        unreachable!();
    };
    assert!(!clean);
    assert_eq!(code, 1006);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn server_going_away_triggers_reconnect() {
    init_tracing();
    let url = spawn_server(ServerMode::GoAway).await;
    let client = ReconnectingClient::builder()
        .url(url)
        .reconnect_interval(Duration::from_millis(50))
        .transport(TungsteniteTransport::new().with_connect_timeout(Duration::from_secs(5)))
        .build()
        .unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();
    opened(&mut notifications).await;

    assert_eq!(
        closed(&mut notifications).await,
        Notification::Closed {
            clean: true,
            code: 1001,
            reason: "maintenance".into(),
        }
    );

    // The scheduled reconnect opens a fresh connection.
    opened(&mut notifications).await;

    client.shutdown();
    client.terminated().await;
}

#[tokio::test]
async fn unanswered_close_does_not_reconnect() {
    init_tracing();
    let url = spawn_server(ServerMode::Mute).await;
    let client = ReconnectingClient::builder()
        .url(url)
        .reconnect_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    let mut notifications = client.subscribe();

    client.open().unwrap();
    opened(&mut notifications).await;

    client.close().unwrap();
    let Notification::Closed { clean, code, .. } = closed(&mut notifications).await else {
        unreachable!();
    };
    assert!(!clean);
    assert_eq!(code, 1006);

    let reopened = tokio::time::timeout(Duration::from_millis(500), opened(&mut notifications)).await;
    assert!(reopened.is_err());
    assert_eq!(client.state(), ConnectionState::Closed);
}

//! Reconnecting echo client.
//!
//! Demonstrates:
//! - Building a client with JSON payloads and auto-connect
//! - Sending on every (re)open
//! - Printing lifecycle notifications
//! - Graceful shutdown on Ctrl+C
//!
//! Usage:
//!   cargo run --example echo
//!   cargo run --example echo -- ws://127.0.0.1:9001/echo
//!   cargo run --example echo -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reconnecting_websocket::{Notification, PayloadEncoding, ReconnectingClient, Result};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://127.0.0.1:9001/echo";

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    url: String,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            url: args
                .iter()
                .find(|a| !a.starts_with("--"))
                .cloned()
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "reconnecting_websocket=trace"
    } else {
        "reconnecting_websocket=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Reconnecting Echo ===\n");
    println!("    URL: {}", args.url);

    let client = ReconnectingClient::builder()
        .url(&args.url)
        .label("echo")
        .payload_encoding(PayloadEncoding::Json)
        .reconnect_interval(Duration::from_secs(2))
        .auto_connect(true)
        .verbose(true)
        .build()?;

    let mut notifications = client.subscribe();
    let mut sequence = 0u64;

    println!("Press Ctrl+C to exit...\n");

    loop {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Ok(Notification::Opened) => {
                    sequence += 1;
                    client.send(&json!({ "op": "hello", "seq": sequence }))?;
                    println!("[open] sent hello #{sequence}");
                }
                Ok(Notification::Message { payload }) => println!("[message] {payload:?}"),
                Ok(Notification::Closed { clean, code, reason }) => {
                    println!("[closed] clean={clean} code={code} reason={reason:?}");
                }
                Ok(Notification::ErrorOccurred { detail }) => println!("[error] {detail}"),
                Ok(Notification::StateChanged { state }) => println!("[state] {state}"),
                Err(RecvError::Lagged(skipped)) => println!("[lagged] skipped {skipped}"),
                Err(RecvError::Closed) => break,
            },

            _ = tokio::signal::ctrl_c() => {
                println!("\n[exit] shutting down");
                break;
            }
        }
    }

    client.shutdown();
    client.terminated().await;

    println!("    Last request: {:?}", client.last_request());
    println!("    Last response: {:?}", client.last_response());

    Ok(())
}

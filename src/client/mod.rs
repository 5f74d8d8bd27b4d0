//! Reconnecting client module.
//!
//! This module provides the main entry point of the crate.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ReconnectingClient`] | Cloneable client handle |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientConfig`] | Host-suppliable settings |
//!
//! # Example
//!
//! ```no_run
//! use reconnecting_websocket::{ReconnectingClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = ReconnectingClient::builder()
//!     .url("ws://127.0.0.1:9001/feed")
//!     .build()?;
//!
//! client.open()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Client handle and event loop.
pub mod core;

/// Connection lifecycle state machine.
mod lifecycle;

/// Client configuration.
pub mod options;

/// Fixed-interval reconnect scheduler.
mod reconnect;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::ReconnectingClient;
pub use options::{ClientConfig, DEFAULT_RECONNECT_INTERVAL_MS};

//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`ReconnectingClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use reconnecting_websocket::{PayloadEncoding, ReconnectingClient};
//!
//! # async fn example() -> reconnecting_websocket::Result<()> {
//! let client = ReconnectingClient::builder()
//!     .url("ws://127.0.0.1:9001/feed")
//!     .protocol("chat")
//!     .payload_encoding(PayloadEncoding::Json)
//!     .reconnect_interval(Duration::from_millis(500))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::protocol::PayloadEncoding;
use crate::transport::{Transport, TungsteniteTransport};

use super::core::ReconnectingClient;
use super::options::ClientConfig;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`ReconnectingClient`].
///
/// Use [`ReconnectingClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Client configuration.
    config: ClientConfig,
    /// Transport; defaults to [`TungsteniteTransport`].
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Appends a subprotocol.
    #[inline]
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.config.protocols.push(protocol.into());
        self
    }

    /// Replaces the subprotocol list.
    #[inline]
    #[must_use]
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_protocols(protocols);
        self
    }

    /// Connects as soon as the client is built.
    #[inline]
    #[must_use]
    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.config.auto_connect = enabled;
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Sets the fixed reconnect interval.
    #[inline]
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_reconnect_interval(interval);
        self
    }

    /// Sets how incoming messages are decoded.
    #[inline]
    #[must_use]
    pub fn payload_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.config.payload_encoding = encoding;
        self
    }

    /// Enables verbose lifecycle logging.
    #[inline]
    #[must_use]
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.config.verbose = enabled;
        self
    }

    /// Sets the log label.
    #[inline]
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = Some(label.into());
        self
    }

    /// Sets the transport used to open connections.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the client and spawns its task on the current Tokio runtime.
    ///
    /// The URL is checked when a connection is attempted, not here.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a subprotocol is invalid or repeated
    /// - [`Error::Config`] if called outside a Tokio runtime
    pub fn build(self) -> Result<ReconnectingClient> {
        self.config.validate_protocols()?;

        let runtime = Handle::try_current().map_err(|_| {
            Error::config(
                "ReconnectingClient must be built inside a Tokio runtime.\n\
                 Example: call .build() from within #[tokio::main]",
            )
        })?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(TungsteniteTransport::new()));

        Ok(ReconnectingClient::spawn(self.config, transport, &runtime))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::MemoryTransport;

    #[test]
    fn test_new_creates_default_builder() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.config, ClientConfig::default());
        assert!(builder.transport.is_none());
    }

    #[test]
    fn test_setters_update_config() {
        let builder = ClientBuilder::new()
            .url("ws://h/p")
            .protocol("chat")
            .auto_connect(true)
            .auto_reconnect(false)
            .reconnect_interval(Duration::from_millis(250))
            .payload_encoding(PayloadEncoding::Json)
            .verbose(true)
            .label("feed");

        assert_eq!(builder.config.url.as_deref(), Some("ws://h/p"));
        assert_eq!(builder.config.protocols, vec!["chat"]);
        assert!(builder.config.auto_connect);
        assert!(!builder.config.auto_reconnect);
        assert_eq!(builder.config.reconnect_interval_ms, 250);
        assert_eq!(builder.config.payload_encoding, PayloadEncoding::Json);
        assert!(builder.config.verbose);
        assert_eq!(builder.config.label(), "feed");
    }

    #[test]
    fn test_config_replaces_settings() {
        let config = ClientConfig::new().with_url("ws://h/p").with_verbose(true);
        let builder = ClientBuilder::new().label("old").config(config.clone());
        assert_eq!(builder.config, config);
    }

    #[test]
    fn test_build_fails_outside_runtime() {
        let result = ClientBuilder::new().transport(MemoryTransport::new()).build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Tokio runtime"));
    }

    #[tokio::test]
    async fn test_build_rejects_duplicate_protocols() {
        let result = ClientBuilder::new()
            .url("ws://h/p")
            .protocols(["chat", "chat"])
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_build_without_url_succeeds() {
        let client = ClientBuilder::new()
            .transport(MemoryTransport::new())
            .build()
            .unwrap();
        assert!(client.is_running());
    }

    #[test]
    fn test_builder_debug_hides_transport() {
        let builder = ClientBuilder::new().transport(MemoryTransport::new());
        let debug = format!("{builder:?}");
        assert!(debug.contains("custom_transport: true"));
    }
}

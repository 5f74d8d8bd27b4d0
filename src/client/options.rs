//! Client configuration.
//!
//! [`ClientConfig`] carries every setting a host can supply. It can be built
//! in code or deserialized from a camelCase JSON document.
//!
//! # Example
//!
//! ```ignore
//! use reconnecting_websocket::{ClientConfig, PayloadEncoding};
//!
//! let config = ClientConfig::new()
//!     .with_url("ws://127.0.0.1:9001/feed")
//!     .with_protocol("chat")
//!     .with_payload_encoding(PayloadEncoding::Json);
//!
//! let from_host: ClientConfig = serde_json::from_str(
//!     r#"{ "url": "ws://h/p", "autoReconnect": false, "payloadEncoding": "json" }"#,
//! )?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::PayloadEncoding;

// ============================================================================
// Constants
// ============================================================================

/// Default delay before a reconnect attempt, in milliseconds.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 1000;

// ============================================================================
// ClientConfig
// ============================================================================

/// Reconnecting client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// WebSocket URL. Required by the time a connection is attempted.
    pub url: Option<String>,

    /// Subprotocols offered during the handshake, in preference order.
    pub protocols: Vec<String>,

    /// Connect as soon as the client is built.
    pub auto_connect: bool,

    /// Reconnect after abnormal closes and errors.
    pub auto_reconnect: bool,

    /// Fixed delay before each reconnect attempt.
    pub reconnect_interval_ms: u64,

    /// Interpretation of incoming messages.
    pub payload_encoding: PayloadEncoding,

    /// Log lifecycle events at info/warn/error instead of debug.
    pub verbose: bool,

    /// Name used for this client in logs.
    pub label: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientConfig {
    /// Creates a configuration with default settings.
    ///
    /// Auto-reconnect is enabled with a 1000ms interval; auto-connect is off.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            url: None,
            protocols: Vec::new(),
            auto_connect: false,
            auto_reconnect: true,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            payload_encoding: PayloadEncoding::Raw,
            verbose: false,
            label: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientConfig {
    /// Sets the WebSocket URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Appends a subprotocol.
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Replaces the subprotocol list.
    #[inline]
    #[must_use]
    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables connecting on build.
    #[inline]
    #[must_use]
    pub fn with_auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the reconnect interval.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the incoming payload encoding.
    #[inline]
    #[must_use]
    pub fn with_payload_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.payload_encoding = encoding;
        self
    }

    /// Enables verbose lifecycle logging.
    #[inline]
    #[must_use]
    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Sets the log label.
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ClientConfig {
    /// Returns the reconnect interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Returns the label used in logs, or `"web-socket"`.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("web-socket")
    }

    /// Parses and checks the configured URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is missing, does not parse, or
    /// does not use the `ws`/`wss` scheme.
    ///
    /// `wss` passes here but needs a transport with TLS support;
    /// [`TungsteniteTransport`](crate::transport::TungsteniteTransport) has
    /// none and rejects it at connect time.
    pub fn parsed_url(&self) -> Result<Url> {
        let raw = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::config("Please provide a valid WebSocket url"))?;

        let url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid WebSocket url '{raw}': {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::config(format!(
                "Unsupported scheme '{scheme}' in '{raw}', expected ws or wss"
            ))),
        }
    }

    /// Checks the subprotocol list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a protocol is empty, contains whitespace,
    /// separators or non-ASCII characters, or appears twice.
    pub fn validate_protocols(&self) -> Result<()> {
        for (index, protocol) in self.protocols.iter().enumerate() {
            let valid = !protocol.is_empty()
                && protocol
                    .chars()
                    .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c));
            if !valid {
                return Err(Error::config(format!("Invalid subprotocol '{protocol}'")));
            }
            if self.protocols[..index].contains(protocol) {
                return Err(Error::config(format!("Duplicate subprotocol '{protocol}'")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

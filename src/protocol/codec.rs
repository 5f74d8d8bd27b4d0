//! Payload encoding and decoding.
//!
//! Outgoing data is always serialized to a JSON string. Incoming text is
//! decoded according to the configured [`PayloadEncoding`].
//!
//! | Encoding | Incoming text becomes |
//! |----------|-----------------------|
//! | `raw` | [`Payload::Text`] unchanged |
//! | `json` | [`Payload::Json`], or [`Error::Decode`] if malformed |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// PayloadEncoding
// ============================================================================

/// How incoming messages are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Pass message text through unchanged.
    #[default]
    Raw,
    /// Parse message text as JSON.
    Json,
}

impl FromStr for PayloadEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "" => Ok(Self::Raw),
            "json" => Ok(Self::Json),
            other => Err(Error::config(format!(
                "Unknown payload encoding '{other}', expected \"raw\" or \"json\""
            ))),
        }
    }
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Json => f.write_str("json"),
        }
    }
}

// ============================================================================
// Payload
// ============================================================================

/// A decoded incoming message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Message text under [`PayloadEncoding::Raw`].
    Text(String),
    /// Parsed value under [`PayloadEncoding::Json`].
    Json(Value),
}

impl Payload {
    /// Returns the text if this is a raw payload.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Returns the value if this is a JSON payload.
    #[inline]
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

// ============================================================================
// PayloadCodec
// ============================================================================

/// Encodes outgoing data and decodes incoming text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadCodec {
    encoding: PayloadEncoding,
}

impl PayloadCodec {
    /// Creates a codec for the given incoming encoding.
    #[inline]
    #[must_use]
    pub const fn new(encoding: PayloadEncoding) -> Self {
        Self { encoding }
    }

    /// Returns the incoming encoding.
    #[inline]
    #[must_use]
    pub const fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    /// Serializes outgoing data to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `data` cannot be serialized.
    pub fn encode<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        Ok(serde_json::to_string(data)?)
    }

    /// Decodes incoming message text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the encoding is JSON and `text` does not
    /// parse.
    pub fn decode(&self, text: &str) -> Result<Payload> {
        match self.encoding {
            PayloadEncoding::Raw => Ok(Payload::Text(text.to_owned())),
            PayloadEncoding::Json => serde_json::from_str(text)
                .map(Payload::Json)
                .map_err(Error::decode),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

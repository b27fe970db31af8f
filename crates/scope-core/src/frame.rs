//! Raw relay frames.
//!
//! A frame is accepted when its text parses as JSON (any JSON value). The
//! parsed value is discarded; peers receive the original text unchanged.

use crate::errors::FrameError;

/// A JSON text frame received from a socket peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame {
    text: String,
}

impl RelayFrame {
    /// Accept a text frame if it is valid JSON.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let _: serde::de::IgnoredAny = serde_json::from_str(text)?;
        Ok(Self {
            text: text.to_owned(),
        })
    }

    /// Accept a binary frame if it is UTF-8 text holding valid JSON.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(bytes).map_err(|_| FrameError::NotUtf8)?;
        Self::parse(text)
    }

    /// Original frame text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the frame text is empty (never true for a parsed frame).
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

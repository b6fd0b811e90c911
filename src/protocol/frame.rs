//! Inbound frame classification.
//!
//! Every text message received from the server is classified into exactly
//! one [`Frame`] before routing.
//!
//! # Wire Shapes
//!
//! | Shape | Example | Routed by |
//! |-------|---------|-----------|
//! | Tuple | `["user:abc/console",{"messages":{}}]` | exact channel match |
//! | Raw | `time 1700000000` | literal key prefix |
//!
//! A message is tuple-encoded when it starts with `["`. The array is decoded
//! with `serde_json` as a strict two-element `(string, value)` pair; the
//! payload is kept as the verbatim JSON text of the second element.

// ============================================================================
// Imports
// ============================================================================

use serde_json::from_str;
use serde_json::value::RawValue;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix marking a tuple-encoded message.
pub const TUPLE_PREFIX: &str = "[\"";

// ============================================================================
// Frame
// ============================================================================

/// One classified inbound message.
///
/// Frames borrow from the message text and live for a single dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// `["<channel>",<payload>]`
    Tuple {
        /// Decoded channel identifier (JSON escapes resolved).
        channel: String,
        /// Verbatim JSON text of the second array element.
        payload: &'a str,
    },

    /// Any message not beginning with `["`.
    Raw {
        /// The message text, unmodified.
        text: &'a str,
    },
}

impl<'a> Frame<'a> {
    /// Classifies one inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text starts with `["` but is
    /// not a two-element array whose first element is a string.
    pub fn parse(text: &'a str) -> Result<Self> {
        if !is_tuple_encoded(text) {
            return Ok(Self::Raw { text });
        }

        let (channel, payload): (String, &'a RawValue) =
            from_str(text).map_err(|e| Error::malformed_frame(e.to_string()))?;

        Ok(Self::Tuple {
            channel,
            payload: payload.get(),
        })
    }

    /// Returns `true` for [`Frame::Tuple`].
    #[inline]
    #[must_use]
    pub fn is_tuple(&self) -> bool {
        matches!(self, Self::Tuple { .. })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` if the message uses the tuple encoding.
#[inline]
#[must_use]
pub fn is_tuple_encoded(text: &str) -> bool {
    text.starts_with(TUPLE_PREFIX)
}

/// Returns at most the first `max_chars` characters of `text`.
///
/// Cuts on a character boundary, so multi-byte text never panics.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

// ============================================================================
// Tests
// ============================================================================

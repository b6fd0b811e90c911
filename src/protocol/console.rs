//! Console payload envelope.
//!
//! The server streams console output on a per-user channel. Each payload is
//! a JSON object of the form:
//!
//! ```json
//! {
//!   "messages": { "log": ["..."], "results": ["..."] },
//!   "error": "..."
//! }
//! ```
//!
//! Every field is optional. The multiplexer never decodes payloads itself;
//! this type is for subscribers of console channels.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::from_str;

use crate::error::Result;

// ============================================================================
// ConsoleEnvelope
// ============================================================================

/// A decoded console payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleEnvelope {
    /// Error text reported by the server (e.g. a script exception).
    pub error: Option<String>,

    /// Log and command-result lines.
    pub messages: Option<ConsoleMessages>,
}

/// The `messages` object of a console payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleMessages {
    /// Lines written by `console.log`.
    pub log: Vec<String>,

    /// Results of console commands.
    pub results: Vec<String>,
}

/// One console line, tagged by origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLine<'a> {
    /// A `console.log` line.
    Log(&'a str),
    /// A command result.
    Result(&'a str),
}

impl ConsoleLine<'_> {
    /// Returns the line text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Log(text) | Self::Result(text) => text,
        }
    }
}

impl ConsoleEnvelope {
    /// Decodes a console payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the payload is not a JSON object of
    /// the expected shape.
    pub fn parse(payload: &str) -> Result<Self> {
        Ok(from_str(payload)?)
    }

    /// Returns `true` if the server reported an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Iterates log lines, then result lines.
    pub fn lines(&self) -> impl Iterator<Item = ConsoleLine<'_>> {
        let messages = self.messages.as_ref();
        let log = messages
            .into_iter()
            .flat_map(|m| m.log.iter())
            .map(|line| ConsoleLine::Log(line.as_str()));
        let results = messages
            .into_iter()
            .flat_map(|m| m.results.iter())
            .map(|line| ConsoleLine::Result(line.as_str()));
        log.chain(results)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_envelope() {
        let payload = r#"{"messages":{"log":["tick 1","tick 2"],"results":["42"]}}"#;
        let envelope = ConsoleEnvelope::parse(payload).expect("parse envelope");

        assert!(!envelope.is_error());
        let lines: Vec<_> = envelope.lines().collect();
        assert_eq!(
            lines,
            vec![
                ConsoleLine::Log("tick 1"),
                ConsoleLine::Log("tick 2"),
                ConsoleLine::Result("42"),
            ]
        );
    }

    #[test]
    fn test_parse_error_only() {
        let envelope =
            ConsoleEnvelope::parse(r#"{"error":"ReferenceError: x"}"#).expect("parse envelope");
        assert!(envelope.is_error());
        assert_eq!(envelope.lines().count(), 0);
    }

    #[test]
    fn test_parse_partial_messages() {
        let envelope =
            ConsoleEnvelope::parse(r#"{"messages":{"results":["ok"]}}"#).expect("parse envelope");
        let texts: Vec<_> = envelope.lines().map(|l| l.text().to_string()).collect();
        assert_eq!(texts, vec!["ok"]);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(ConsoleEnvelope::parse(r#""just a string""#).is_err());
    }
}

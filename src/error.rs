//! Error types for the socket multiplexer.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use screeps_socket::{Connection, Result};
//!
//! async fn example(connection: &Connection) -> Result<()> {
//!     connection.connect().await?;
//!     connection.send("gzip on").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Lifecycle | [`Error::InvalidState`], [`Error::NotOpen`], [`Error::Send`] |
//! | Frames | [`Error::MalformedFrame`], [`Error::HandlerFault`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the WebSocket handshake cannot be completed.
    /// The connection stays [`ConnectionState::Idle`].
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// Underlying handshake failure.
        #[source]
        source: WsError,
    },

    /// Connection timeout during the handshake.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection was closed while the operation was in progress.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation is not valid in the current connection state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State the connection was in.
        state: ConnectionState,
    },

    /// Outbound message rejected because the connection is not open.
    ///
    /// No transport I/O was performed.
    #[error("Connection not open (state: {state})")]
    NotOpen {
        /// State the connection was in.
        state: ConnectionState,
    },

    /// Transport failed to write an outbound message.
    #[error("Send failed: {source}")]
    Send {
        /// Underlying transport failure.
        #[source]
        source: WsError,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Inbound text looked tuple-encoded but failed structured decoding.
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Description of the decoding failure.
        message: String,
    },

    /// A subscription handler failed while processing a payload.
    #[error("Handler for channel '{channel}' failed: {message}")]
    HandlerFault {
        /// Channel key of the failing handler.
        channel: String,
        /// Panic message or failure description.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>, source: WsError) -> Self {
        Self::Connection {
            message: message.into(),
            source,
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(operation: &'static str, state: ConnectionState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Creates a not-open error.
    #[inline]
    pub fn not_open(state: ConnectionState) -> Self {
        Self::NotOpen { state }
    }

    /// Creates a send error.
    #[inline]
    pub fn send(source: WsError) -> Self {
        Self::Send { source }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates a handler fault error.
    #[inline]
    pub fn handler_fault(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerFault {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
        )
    }

    /// Returns `true` if this error concerns a single inbound frame.
    ///
    /// Frame errors are recovered locally and never stop the receive loop.
    #[inline]
    #[must_use]
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame { .. } | Self::HandlerFault { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors leave the connection usable.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Send { .. }
                | Self::NotOpen { .. }
                | Self::MalformedFrame { .. }
                | Self::HandlerFault { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

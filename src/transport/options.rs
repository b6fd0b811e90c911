//! Connection tuning options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use screeps_socket::ConnectionOptions;
//!
//! let options = ConnectionOptions::new()
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_preview_len(80);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::dispatch::DEFAULT_PREVIEW_LEN;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on delivering the close frame during shutdown.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Tuning knobs for a [`Connection`](super::Connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Maximum time allowed for the WebSocket handshake.
    pub connect_timeout: Duration,

    /// Maximum time `close()` spends delivering the close frame.
    ///
    /// Past it the socket is dropped without a close handshake.
    pub close_timeout: Duration,

    /// Characters of an unmatched message kept in diagnostics.
    pub preview_len: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the close frame timeout.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Sets the diagnostic preview length.
    #[inline]
    #[must_use]
    pub fn with_preview_len(mut self, preview_len: usize) -> Self {
        self.preview_len = preview_len;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

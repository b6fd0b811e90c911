//! Builder pattern for connection configuration.
//!
//! # Example
//!
//! ```no_run
//! use screeps_socket::Connection;
//!
//! # fn example() -> screeps_socket::Result<()> {
//! let connection = Connection::builder()
//!     .server("localhost", 21025)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::connection::Connection;
use super::options::ConnectionOptions;

// ============================================================================
// Constants
// ============================================================================

/// WebSocket endpoint path of a private server.
pub const SOCKET_PATH: &str = "/socket/websocket";

// ============================================================================
// ConnectionBuilder
// ============================================================================

/// Builder for configuring a [`Connection`].
///
/// Use [`Connection::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ConnectionBuilder {
    /// Target WebSocket URL.
    url: Option<String>,
    /// Tuning options.
    options: ConnectionOptions,
}

impl ConnectionBuilder {
    /// Creates a new builder with no target.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WebSocket URL (`ws://`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Targets the socket endpoint of a server at `host:port`.
    ///
    /// Produces `ws://{host}:{port}/socket/websocket`.
    #[inline]
    #[must_use]
    pub fn server(self, host: &str, port: u16) -> Self {
        self.url(format!("ws://{host}:{port}{SOCKET_PATH}"))
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets how long `close()` waits to deliver the close frame.
    #[inline]
    #[must_use]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.options.close_timeout = timeout;
        self
    }

    /// Sets how many characters of an unmatched message are logged.
    #[inline]
    #[must_use]
    pub fn preview_len(mut self, preview_len: usize) -> Self {
        self.options.preview_len = preview_len;
        self
    }

    /// Replaces all tuning options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds an unconnected [`Connection`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no URL was set or its scheme is not `ws`
    ///   (no TLS transport is compiled in, so `wss` is rejected)
    /// - [`Error::Url`] if the URL does not parse
    pub fn build(self) -> Result<Connection> {
        let url = self.validate_url()?;
        Ok(Connection::new(url, self.options))
    }

    fn validate_url(&self) -> Result<Url> {
        let raw = self
            .url
            .as_deref()
            .ok_or_else(|| Error::config("WebSocket URL is required"))?;

        let url = Url::parse(raw)?;
        match url.scheme() {
            "ws" => Ok(url),
            "wss" => Err(Error::config(
                "wss:// requires TLS support, which this build does not include",
            )),
            other => Err(Error::config(format!(
                "Unsupported URL scheme '{other}', expected ws"
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::ConnectionState;

    #[test]
    fn test_build_requires_url() {
        let err = ConnectionBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_rejects_http_scheme() {
        let err = ConnectionBuilder::new()
            .url("http://localhost:21025")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_rejects_wss_scheme() {
        let err = ConnectionBuilder::new()
            .url("wss://example.com/socket/websocket")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("TLS"));
    }

    #[test]
    fn test_build_rejects_garbage() {
        let err = ConnectionBuilder::new().url("::nope::").build().unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_server_url() {
        let connection = ConnectionBuilder::new()
            .server("localhost", 21025)
            .build()
            .expect("build");
        assert_eq!(
            connection.url().as_str(),
            "ws://localhost:21025/socket/websocket"
        );
        assert_eq!(connection.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_options_carried() {
        let connection = ConnectionBuilder::new()
            .url("ws://example.com/socket/websocket")
            .connect_timeout(Duration::from_secs(3))
            .close_timeout(Duration::from_secs(1))
            .preview_len(10)
            .build()
            .expect("build");
        assert_eq!(connection.options().connect_timeout, Duration::from_secs(3));
        assert_eq!(connection.options().close_timeout, Duration::from_secs(1));
        assert_eq!(connection.options().preview_len, 10);
    }
}

//! Socket capability trait.
//!
//! Code that only needs "a duplex socket with channel subscriptions" depends
//! on [`Socket`] instead of [`Connection`], which keeps it testable against
//! in-memory fakes.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

use super::connection::Connection;
use super::registry::Handler;

// ============================================================================
// Socket
// ============================================================================

/// A duplex text socket that routes inbound frames to channel handlers.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Opens the socket and starts routing inbound frames.
    async fn connect(&self) -> Result<()>;

    /// Closes the socket, waiting until no handler can run anymore.
    async fn close(&self);

    /// Sends one text message, unmodified.
    async fn send(&self, message: String) -> Result<()>;

    /// Routes frames for `key` to `handler`, replacing any previous handler.
    fn subscribe(&self, key: String, handler: Handler);

    /// Removes the handler for `key`, if any.
    fn unsubscribe(&self, key: &str);
}

#[async_trait]
impl Socket for Connection {
    async fn connect(&self) -> Result<()> {
        Connection::connect(self).await
    }

    async fn close(&self) {
        Connection::close(self).await;
    }

    async fn send(&self, message: String) -> Result<()> {
        Connection::send(self, message).await
    }

    fn subscribe(&self, key: String, handler: Handler) {
        self.subscribe_handler(key, handler);
    }

    fn unsubscribe(&self, key: &str) {
        Connection::unsubscribe(self, key);
    }
}

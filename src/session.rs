//! Console streaming session.
//!
//! A [`ConsoleSession`] is the context object created once the caller has
//! signed in and looked up its user id. It ties that id to the socket and is
//! what the shutdown path receives, so no global state is needed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use screeps_socket::{Connection, ConsoleSession};
//!
//! # async fn example() -> screeps_socket::Result<()> {
//! let connection = Arc::new(Connection::builder().server("localhost", 21025).build()?);
//! connection.connect().await?;
//!
//! let session = ConsoleSession::new("5a1b2c3d", connection);
//! session.listen(|envelope| {
//!     for line in envelope.lines() {
//!         println!("{}", line.text());
//!     }
//! });
//!
//! tokio::signal::ctrl_c().await?;
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::protocol::ConsoleEnvelope;
use crate::transport::{Handler, Socket};

// ============================================================================
// ConsoleSession
// ============================================================================

/// A signed-in user's console stream over a shared socket.
pub struct ConsoleSession {
    /// User id; doubles as the console channel key.
    user_id: String,
    /// Socket the console channel is subscribed on.
    socket: Arc<dyn Socket>,
}

impl ConsoleSession {
    /// Creates a session for `user_id` on `socket`.
    pub fn new(user_id: impl Into<String>, socket: Arc<dyn Socket>) -> Self {
        Self {
            user_id: user_id.into(),
            socket,
        }
    }

    /// Returns the user id.
    #[inline]
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the channel key console payloads arrive on.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.user_id
    }

    /// Returns the underlying socket.
    #[inline]
    #[must_use]
    pub fn socket(&self) -> &Arc<dyn Socket> {
        &self.socket
    }

    /// Subscribes `on_envelope` to the console channel.
    ///
    /// Payloads that do not decode as a [`ConsoleEnvelope`] are logged and
    /// skipped. Calling again replaces the previous listener.
    pub fn listen<F>(&self, on_envelope: F)
    where
        F: Fn(ConsoleEnvelope) + Send + Sync + 'static,
    {
        let channel = self.user_id.clone();
        let handler: Handler = Arc::new(move |payload: &str| {
            match ConsoleEnvelope::parse(payload) {
                Ok(envelope) => on_envelope(envelope),
                Err(e) => warn!(channel = %channel, error = %e, "Undecodable console payload"),
            }
        });

        self.socket.subscribe(self.user_id.clone(), handler);
        debug!(channel = %self.user_id, "Console listener registered");
    }

    /// Removes the console listener.
    pub fn stop_listening(&self) {
        self.socket.unsubscribe(&self.user_id);
    }

    /// Stops listening and closes the socket.
    pub async fn shutdown(&self) {
        self.stop_listening();
        self.socket.close().await;
        info!(user_id = %self.user_id, "Console session shut down");
    }
}

impl fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

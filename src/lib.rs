//! Screeps Socket - persistent WebSocket channel multiplexer.
//!
//! This library owns one long-lived WebSocket to a Screeps server and routes
//! every inbound message to handlers registered per channel, while callers
//! subscribe and unsubscribe at any time.
//!
//! # Architecture
//!
//! - **Connection**: owns the WebSocket, runs one receive loop task
//! - **Frame**: `["<channel>",<payload>]` tuples or raw text
//! - **Dispatcher**: tuples route by exact channel, raw text by key prefix
//! - **Registry**: ordered, lock-protected channel → handler map
//!
//! Handlers run one at a time on the receive loop. Delivery is best-effort
//! and at-most-once; nothing is retried.
//!
//! # Quick Start
//!
//! ```no_run
//! use screeps_socket::{Connection, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = Connection::builder()
//!         .server("localhost", 21025)
//!         .build()?;
//!
//!     connection.subscribe("time", |text| println!("{text}"));
//!     connection.connect().await?;
//!     connection.send("gzip off").await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     connection.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Frame classification and console payloads |
//! | [`session`] | Console streaming context |
//! | [`transport`] | Connection, routing and subscriptions |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Inbound message types.
pub mod protocol;

/// Console streaming session.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ConsoleEnvelope, ConsoleLine, ConsoleMessages, Frame};

// Session types
pub use session::ConsoleSession;

// Transport types
pub use transport::{
    Connection, ConnectionBuilder, ConnectionOptions, ConnectionState, Dispatch, Dispatcher,
    Handler, Registry, Socket,
};

//! WebSocket transport layer.
//!
//! This module owns the duplex connection to the server and demultiplexes
//! inbound messages to handlers keyed by channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Connection                               │        ┌──────────────┐
//! │                                          │  ws:// │              │
//! │  send() ──► write half ─────────────────────────► │              │
//! │                                          │        │    Server    │
//! │  receive loop ◄── read half ◄──────────────────── │              │
//! │     │                                    │        └──────────────┘
//! │     ▼                                    │
//! │  Frame::parse ──► Dispatcher ──► Registry│◄── subscribe()/unsubscribe()
//! │                                 handler  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Connection builder and URL validation |
//! | `connection` | Lifecycle and receive loop |
//! | `dispatch` | Routing policy |
//! | `options` | Tuning options |
//! | `registry` | Channel subscriptions |
//! | `socket` | Capability trait over the connection |

// ============================================================================
// Submodules
// ============================================================================

/// Connection builder.
pub mod builder;

/// WebSocket connection and receive loop.
pub mod connection;

/// Frame routing.
pub mod dispatch;

/// Connection tuning options.
pub mod options;

/// Channel subscriptions.
pub mod registry;

/// Socket capability trait.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ConnectionBuilder, SOCKET_PATH};
pub use connection::{Connection, ConnectionState};
pub use dispatch::{DEFAULT_PREVIEW_LEN, Dispatch, Dispatcher};
pub use options::{ConnectionOptions, DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};
pub use registry::{Handler, Registry};
pub use socket::Socket;

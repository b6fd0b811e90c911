//! Inbound message types.
//!
//! This module defines how text received from the server is classified
//! and how console payloads are decoded by their subscribers.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | Tuple frame | Remote → Local | `["<channel>",<payload>]` channel traffic |
//! | Raw frame | Remote → Local | Untagged text, routed by key prefix |
//! | Outbound text | Local → Remote | Passed through unmodified |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Frame classification and decoding |
//! | `console` | Console payload envelope |

// ============================================================================
// Submodules
// ============================================================================

/// Frame classification.
pub mod frame;

/// Console payload envelope.
pub mod console;

// ============================================================================
// Re-exports
// ============================================================================

pub use console::{ConsoleEnvelope, ConsoleLine, ConsoleMessages};
pub use frame::{Frame, TUPLE_PREFIX, is_tuple_encoded, preview};

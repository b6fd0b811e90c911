//! Frame routing.
//!
//! Applies the routing policy to one inbound message:
//!
//! | Frame | Lookup | Handler receives |
//! |-------|--------|------------------|
//! | Tuple | exact channel match | decoded payload |
//! | Raw | first key (ascending) that prefixes the text | entire text |
//!
//! At most one handler runs per message. A panicking handler is contained
//! here and reported; it never reaches the receive loop.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::Error;
use crate::protocol::{Frame, preview};

use super::registry::{Handler, Registry};

// ============================================================================
// Constants
// ============================================================================

/// Default number of characters kept in unmatched-frame diagnostics.
pub const DEFAULT_PREVIEW_LEN: usize = 40;

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran to completion.
    Delivered {
        /// Key of the handler that ran.
        key: String,
    },

    /// Tuple frame for a channel nobody subscribed to.
    Dropped {
        /// The unmatched channel.
        channel: String,
    },

    /// Raw frame with no matching key prefix.
    Unmatched {
        /// Leading characters of the message.
        preview: String,
    },

    /// Tuple-looking text that failed to decode.
    Malformed {
        /// Decoder error description.
        message: String,
    },

    /// The selected handler panicked.
    HandlerFault {
        /// Key of the failing handler.
        key: String,
        /// Panic message.
        message: String,
    },
}

impl Dispatch {
    /// Returns `true` if a handler ran to completion.
    #[inline]
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes inbound messages to registry handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    preview_len: usize,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    #[inline]
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    /// Sets the diagnostic preview length.
    #[inline]
    #[must_use]
    pub fn with_preview_len(mut self, preview_len: usize) -> Self {
        self.preview_len = preview_len;
        self
    }

    /// Classifies and routes one inbound message.
    pub fn dispatch(&self, text: &str) -> Dispatch {
        match Frame::parse(text) {
            Ok(frame) => self.dispatch_frame(frame),
            Err(Error::MalformedFrame { message }) => {
                warn!(
                    error = %message,
                    text = preview(text, self.preview_len),
                    "Malformed frame dropped"
                );
                Dispatch::Malformed { message }
            }
            Err(e) => {
                warn!(error = %e, "Frame classification failed");
                Dispatch::Malformed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Routes an already classified frame.
    pub fn dispatch_frame(&self, frame: Frame<'_>) -> Dispatch {
        match frame {
            Frame::Tuple { channel, payload } => match self.registry.get(&channel) {
                Some(handler) => Self::invoke(channel, &handler, payload),
                None => {
                    trace!(channel = %channel, "No subscriber for channel");
                    Dispatch::Dropped { channel }
                }
            },

            Frame::Raw { text } => match self.registry.first_prefix_match(text) {
                Some((key, handler)) => Self::invoke(key, &handler, text),
                None => {
                    let preview = preview(text, self.preview_len).to_string();
                    warn!(text = %preview, "Unmatched socket message");
                    Dispatch::Unmatched { preview }
                }
            },
        }
    }

    /// Runs one handler, containing panics.
    fn invoke(key: String, handler: &Handler, payload: &str) -> Dispatch {
        trace!(key = %key, len = payload.len(), "Dispatching");

        match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
            Ok(()) => Dispatch::Delivered { key },
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                let fault = Error::handler_fault(&key, &message);
                warn!(error = %fault, "Handler fault");
                Dispatch::HandlerFault { key, message }
            }
        }
    }
}

/// Extracts the message of a caught panic.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

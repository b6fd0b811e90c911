//! Subscription registry.
//!
//! Maps channel keys to handlers. Shared between the receive loop (lookups)
//! and any number of callers (subscribe/unsubscribe).
//!
//! Keys are kept in a `BTreeMap` so iteration is in ascending key order,
//! which the prefix routing of raw frames depends on.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

// ============================================================================
// Types
// ============================================================================

/// Subscription handler callback type.
///
/// Receives the payload of each frame routed to its channel. Runs on the
/// receive loop task, so it must not block indefinitely.
pub type Handler = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// Registry
// ============================================================================

/// Concurrency-safe mapping from channel key to [`Handler`].
///
/// Handlers are cloned out of the lock before being invoked, so a running
/// handler never blocks `subscribe` or `unsubscribe`.
#[derive(Default)]
pub struct Registry {
    handlers: RwLock<BTreeMap<String, Handler>>,
}

impl Registry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `key`, replacing any previous handler.
    pub fn subscribe(&self, key: impl Into<String>, handler: Handler) {
        let key = key.into();
        let replaced = self.handlers.write().insert(key.clone(), handler).is_some();
        trace!(key = %key, replaced, "Subscribed");
    }

    /// Removes the handler for `key`.
    ///
    /// Removing a key that is not registered does nothing.
    pub fn unsubscribe(&self, key: &str) {
        let removed = self.handlers.write().remove(key).is_some();
        trace!(key = %key, removed, "Unsubscribed");
    }

    /// Returns the handler bound to exactly `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Handler> {
        self.handlers.read().get(key).cloned()
    }

    /// Returns the first key in ascending order that is a prefix of `text`,
    /// together with its handler.
    #[must_use]
    pub fn first_prefix_match(&self, text: &str) -> Option<(String, Handler)> {
        self.handlers
            .read()
            .iter()
            .find(|(key, _)| text.starts_with(key.as_str()))
            .map(|(key, handler)| (key.clone(), Arc::clone(handler)))
    }

    /// Returns all associations in ascending key order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Handler)> {
        self.handlers
            .read()
            .iter()
            .map(|(key, handler)| (key.clone(), Arc::clone(handler)))
            .collect()
    }

    /// Returns `true` if `key` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.handlers.read().contains_key(key)
    }

    /// Returns the number of subscriptions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns `true` if there are no subscriptions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.handlers.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

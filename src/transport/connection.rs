//! WebSocket connection and receive loop.
//!
//! This module owns the single WebSocket to the server, runs the receive
//! loop that routes inbound messages to subscriptions, and exposes the
//! connect/close/send lifecycle.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect──► Connecting ──► Open ──close──► Closing ──► Closed
//!   │                    │                                       ▲
//!   │                    └──────────────close────────────────────┤
//!   └───────────────────────────────close────────────────────────┘
//! ```
//!
//! # Receive Loop
//!
//! The connection spawns one tokio task per open connection that:
//!
//! - Reads the next inbound message
//! - Classifies and dispatches it (at most one handler runs)
//! - Stops when the state moves to `Closing` or the transport terminates
//!
//! Handlers therefore run one at a time, in arrival order. When the server
//! ends the socket the loop moves the state to `Closing` itself, so an
//! `Open` connection always has a live loop; `close()` finishes the job.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::from_utf8;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::builder::ConnectionBuilder;
use super::dispatch::Dispatcher;
use super::options::ConnectionOptions;
use super::registry::{Handler, Registry};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, never connected.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Receive loop running, sends accepted.
    Open,
    /// Shutdown in progress.
    Closing,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns `true` once shutdown has begun.
    #[inline]
    #[must_use]
    pub const fn is_stopping(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the server.
///
/// Routes inbound messages to subscriptions and forwards outbound text.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`; share it behind an `Arc`. Subscriptions can
/// change at any time, from any task or thread, without waiting on handlers.
pub struct Connection {
    /// Target URL.
    url: Url,
    /// Tuning options.
    options: ConnectionOptions,
    /// Lifecycle state; also the stop signal observed by the receive loop.
    state: Arc<watch::Sender<ConnectionState>>,
    /// Subscriptions (shared with the receive loop).
    registry: Arc<Registry>,
    /// Write half; concurrent sends are serialized here.
    writer: AsyncMutex<Option<WsWrite>>,
    /// Receive loop task.
    receive_loop: Mutex<Option<JoinHandle<()>>>,
    /// Closes when the receive loop exits.
    loop_alive: Mutex<Option<watch::Receiver<()>>>,
    /// Serializes teardown between `close()` and a failed `connect()`.
    shutdown: AsyncMutex<()>,
}

// ============================================================================
// Connection - Constructor
// ============================================================================

impl Connection {
    /// Creates a connection builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Creates an unconnected connection.
    pub(crate) fn new(url: Url, options: ConnectionOptions) -> Self {
        Self {
            url,
            options,
            state: Arc::new(watch::Sender::new(ConnectionState::Idle)),
            registry: Arc::new(Registry::new()),
            writer: AsyncMutex::new(None),
            receive_loop: Mutex::new(None),
            loop_alive: Mutex::new(None),
            shutdown: AsyncMutex::new(()),
        }
    }
}

// ============================================================================
// Connection - Accessors
// ============================================================================

impl Connection {
    /// Returns the target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the tuning options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns `true` while the connection accepts sends.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Returns the number of active subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns a receiver that observes state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Resolves once the receive loop has exited, for any reason.
    ///
    /// Covers both [`close`](Self::close) and the server ending the
    /// connection. Returns immediately if the loop never started.
    pub async fn wait_terminated(&self) {
        let alive = self.loop_alive.lock().clone();
        if let Some(mut alive) = alive {
            while alive.changed().await.is_ok() {}
        }
    }
}

// ============================================================================
// Connection - Subscriptions
// ============================================================================

impl Connection {
    /// Routes frames for `key` to `handler`, replacing any previous handler.
    ///
    /// Tuple frames match `key` exactly; raw frames match when their text
    /// starts with `key`. The handler runs on the receive loop task.
    pub fn subscribe<F>(&self, key: impl Into<String>, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.registry.subscribe(key, Arc::new(handler));
    }

    /// Registers an already shared handler.
    pub fn subscribe_handler(&self, key: impl Into<String>, handler: Handler) {
        self.registry.subscribe(key, handler);
    }

    /// Removes the subscription for `key`, if any.
    pub fn unsubscribe(&self, key: &str) {
        self.registry.unsubscribe(key);
    }
}

// ============================================================================
// Connection - Lifecycle
// ============================================================================

impl Connection {
    /// Opens the WebSocket and starts the receive loop.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the connection is not `Idle`
    /// - [`Error::Connection`] if the handshake fails (state returns to `Idle`)
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds the timeout
    /// - [`Error::ConnectionClosed`] if [`close`](Self::close) ran meanwhile,
    ///   or the server ended the socket before it opened (state `Closing`)
    pub async fn connect(&self) -> Result<()> {
        self.transition(
            "connect",
            &[ConnectionState::Idle],
            ConnectionState::Connecting,
        )?;

        let mut state_rx = self.state.subscribe();
        let connect_timeout = self.options.connect_timeout;
        debug!(url = %self.url, "Connecting");

        let handshake = tokio::select! {
            result = timeout(connect_timeout, connect_async(self.url.as_str())) => result,
            () = wait_stopping(&mut state_rx) => {
                debug!("Close requested during handshake");
                return Err(Error::ConnectionClosed);
            }
        };

        let ws_stream = match handshake {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                self.reset_to_idle();
                return Err(Error::connection("WebSocket handshake failed", e));
            }
            Err(_) => {
                self.reset_to_idle();
                return Err(Error::connection_timeout(millis(connect_timeout)));
            }
        };

        let (ws_write, ws_read) = ws_stream.split();
        *self.writer.lock().await = Some(ws_write);

        let dispatcher = Dispatcher::new(Arc::clone(&self.registry))
            .with_preview_len(self.options.preview_len);
        let (alive_tx, alive_rx) = watch::channel(());
        *self.loop_alive.lock() = Some(alive_rx);
        let handle = tokio::spawn(run_receive_loop(
            ws_read,
            Arc::clone(&self.state),
            dispatcher,
            alive_tx,
        ));
        *self.receive_loop.lock() = Some(handle);

        if self
            .transition("connect", &[ConnectionState::Connecting], ConnectionState::Open)
            .is_err()
        {
            // close() or a remote close ran while the loop was starting
            let _shutdown = self.shutdown.lock().await;
            self.teardown().await;
            return Err(Error::ConnectionClosed);
        }

        info!(url = %self.url, "WebSocket connection established");
        Ok(())
    }

    /// Closes the connection and waits for the receive loop to exit.
    ///
    /// When this returns, no handler is running and none will run again.
    /// All subscriptions are dropped. Calling it again (or concurrently)
    /// waits for the first close to finish. After the server ended the
    /// socket (state `Closing`), this completes the move to `Closed`.
    ///
    /// Delivery of the close frame is bounded by
    /// [`ConnectionOptions::close_timeout`]; a peer that stopped reading
    /// cannot keep this from returning.
    pub async fn close(&self) {
        let mut previous = ConnectionState::Idle;
        self.state.send_if_modified(|state| {
            previous = *state;
            match *state {
                ConnectionState::Idle => {
                    *state = ConnectionState::Closed;
                    true
                }
                ConnectionState::Connecting | ConnectionState::Open => {
                    *state = ConnectionState::Closing;
                    true
                }
                ConnectionState::Closing | ConnectionState::Closed => false,
            }
        });

        if previous == ConnectionState::Idle {
            debug!("Closed before connecting");
            return;
        }

        let _shutdown = self.shutdown.lock().await;
        if self.state() == ConnectionState::Closed {
            return;
        }

        debug!(from = %previous, "Closing");
        self.teardown().await;
        self.registry.clear();
        self.state.send_replace(ConnectionState::Closed);

        info!(url = %self.url, "WebSocket connection closed");
    }

    /// Sends one text message, unmodified.
    ///
    /// # Errors
    ///
    /// - [`Error::NotOpen`] if the connection is not `Open` (nothing is sent)
    /// - [`Error::Send`] if the transport fails to write
    /// - [`Error::ConnectionClosed`] if close began while the write was stalled
    pub async fn send(&self, message: impl Into<String>) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(Error::not_open(state));
        }

        let message = message.into();
        let len = message.len();
        let mut state_rx = self.state.subscribe();

        let mut writer = self.writer.lock().await;
        // close() may have begun while this send waited for the writer
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(Error::not_open(state));
        }
        let Some(ws_write) = writer.as_mut() else {
            return Err(Error::not_open(state));
        };

        tokio::select! {
            result = ws_write.send(Message::Text(message.into())) => result.map_err(Error::send)?,
            () = wait_stopping(&mut state_rx) => {
                debug!(len, "Send abandoned, connection closing");
                return Err(Error::ConnectionClosed);
            }
        }

        trace!(len, "Message sent");
        Ok(())
    }

    /// Applies `from -> to` atomically, returning the previous state.
    fn transition(
        &self,
        operation: &'static str,
        from: &[ConnectionState],
        to: ConnectionState,
    ) -> Result<ConnectionState> {
        let mut previous = ConnectionState::Idle;
        let moved = self.state.send_if_modified(|state| {
            previous = *state;
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        });

        if moved {
            debug!(from = %previous, to = %to, "State transition");
            Ok(previous)
        } else {
            Err(Error::invalid_state(operation, previous))
        }
    }

    /// Returns a failed handshake to `Idle` unless close() took over.
    fn reset_to_idle(&self) {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Joins the receive loop, then sends the close frame.
    ///
    /// The state must already be `Closing`, which stops the loop and any
    /// stalled send.
    async fn teardown(&self) {
        let handle = self.receive_loop.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Receive loop task failed");
        }

        let close_timeout = self.options.close_timeout;
        let close_frame = async {
            let writer = self.writer.lock().await.take();
            match writer {
                Some(mut ws_write) => ws_write.close().await,
                None => Ok(()),
            }
        };

        match timeout(close_timeout, close_frame).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Close frame not delivered"),
            Err(_) => {
                warn!(
                    timeout_ms = millis(close_timeout),
                    "Close frame timed out, dropping socket"
                );
                if let Ok(mut writer) = self.writer.try_lock() {
                    writer.take();
                }
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .field("subscriptions", &self.registry.len())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // A connection dropped without close() must not leave its loop running.
        if let Some(handle) = self.receive_loop.get_mut().take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Receive Loop
// ============================================================================

/// Whole milliseconds in `duration`, saturating.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Resolves once the state is `Closing` or `Closed`.
async fn wait_stopping(state_rx: &mut watch::Receiver<ConnectionState>) {
    let _ = state_rx.wait_for(|state| state.is_stopping()).await;
}

fn is_stopping(state_rx: &watch::Receiver<ConnectionState>) -> bool {
    state_rx.borrow().is_stopping()
}

/// Reads and dispatches inbound messages until stopped.
///
/// If the transport terminates first, the state moves to `Closing`.
/// `_alive` is dropped on exit, which wakes `wait_terminated`.
async fn run_receive_loop(
    mut ws_read: WsRead,
    state: Arc<watch::Sender<ConnectionState>>,
    dispatcher: Dispatcher,
    _alive: watch::Sender<()>,
) {
    let mut state_rx = state.subscribe();

    loop {
        tokio::select! {
            biased;

            () = wait_stopping(&mut state_rx) => {
                debug!("Receive loop stop requested");
                break;
            }

            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if is_stopping(&state_rx) {
                            break;
                        }
                        dispatcher.dispatch(text.as_str());
                    }

                    Some(Ok(Message::Binary(bytes))) => {
                        if is_stopping(&state_rx) {
                            break;
                        }
                        match from_utf8(&bytes) {
                            Ok(text) => {
                                dispatcher.dispatch(text);
                            }
                            Err(e) => warn!(error = %e, len = bytes.len(), "Non-UTF-8 binary message dropped"),
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        mark_terminated(&state);
                        break;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        mark_terminated(&state);
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        mark_terminated(&state);
                        break;
                    }

                    // Ping/Pong are answered by tungstenite
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("Receive loop terminated");
}

/// Moves a live connection to `Closing` after the transport ended.
fn mark_terminated(state: &watch::Sender<ConnectionState>) {
    let moved = state.send_if_modified(|state| {
        if matches!(*state, ConnectionState::Connecting | ConnectionState::Open) {
            *state = ConnectionState::Closing;
            true
        } else {
            false
        }
    });
    if moved {
        debug!("Transport ended, connection closing");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn idle_connection(url: &str) -> Connection {
        Connection::new(Url::parse(url).expect("url"), ConnectionOptions::default())
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Idle.to_string(), "idle");
        assert_eq!(ConnectionState::Closing.to_string(), "closing");
    }

    #[test]
    fn test_is_stopping() {
        assert!(!ConnectionState::Open.is_stopping());
        assert!(ConnectionState::Closing.is_stopping());
        assert!(ConnectionState::Closed.is_stopping());
    }

    #[tokio::test]
    async fn test_send_while_idle_fails() {
        let connection = idle_connection("ws://127.0.0.1:9/socket/websocket");

        let err = connection.send("hello").await.unwrap_err();

        assert!(matches!(
            err,
            Error::NotOpen {
                state: ConnectionState::Idle
            }
        ));
    }

    #[tokio::test]
    async fn test_close_from_idle() {
        let connection = idle_connection("ws://127.0.0.1:9/");
        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);

        // Idempotent
        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_after_close_rejected() {
        let connection = idle_connection("ws://127.0.0.1:9/");
        connection.close().await;

        let err = connection.connect().await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                operation: "connect",
                state: ConnectionState::Closed
            }
        ));
    }

    #[tokio::test]
    async fn test_connect_refused_returns_to_idle() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let connection = Connection::new(
            Url::parse(&format!("ws://127.0.0.1:{port}/")).expect("url"),
            ConnectionOptions::new().with_connect_timeout(Duration::from_secs(5)),
        );

        let err = connection.connect().await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(connection.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    /// Accepts one client and reads until it goes away.
    async fn draining_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws_stream = tokio_tungstenite::accept_async(stream)
                .await
                .expect("websocket upgrade");
            while let Some(Ok(_)) = ws_stream.next().await {}
        });

        format!("ws://127.0.0.1:{port}/")
    }

    #[tokio::test]
    async fn test_send_rechecks_state_after_waiting_for_writer() {
        let url = draining_server().await;
        let connection = Arc::new(idle_connection(&url));
        connection.connect().await.expect("connect");

        let writer = connection.writer.lock().await;
        let sender = {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move { connection.send("late").await })
        };
        // Let the send pass its first check and queue on the writer.
        tokio::task::yield_now().await;

        connection.state.send_replace(ConnectionState::Closing);
        drop(writer);

        let err = sender.await.expect("task").unwrap_err();
        assert!(matches!(
            err,
            Error::NotOpen {
                state: ConnectionState::Closing
            }
        ));

        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_subscription_count() {
        let connection = idle_connection("ws://127.0.0.1:9/");
        connection.subscribe("a", |_| {});
        connection.subscribe("b", |_| {});
        connection.subscribe("a", |_| {});
        assert_eq!(connection.subscription_count(), 2);

        connection.unsubscribe("missing");
        connection.unsubscribe("a");
        assert_eq!(connection.subscription_count(), 1);
    }
}

//! Shared utilities for integration tests.
//!
//! Provides an in-process WebSocket server that pushes scripted messages to
//! the client and records what the client sends.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// TestServer
// ============================================================================

/// Single-client WebSocket server bound to a random localhost port.
pub struct TestServer {
    /// `ws://` URL of the server socket endpoint.
    pub url: String,
    /// Messages to push to the client.
    push: mpsc::UnboundedSender<Message>,
    /// Text messages received from the client.
    received: mpsc::UnboundedReceiver<String>,
}

impl TestServer {
    /// Binds and starts accepting one client.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Message>();
        let (received_tx, received_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws_stream = accept_async(stream).await.expect("websocket upgrade");
            let (mut write, mut read) = ws_stream.split();

            loop {
                tokio::select! {
                    Some(message) = push_rx.recv() => {
                        if write.send(message).await.is_err() {
                            break;
                        }
                    }
                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(text.to_string());
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
            }
        });

        Self {
            url: format!("ws://127.0.0.1:{port}/socket/websocket"),
            push: push_tx,
            received: received_rx,
        }
    }

    /// Pushes a text message to the client.
    ///
    /// Silently ignored once the client has disconnected.
    pub fn push(&self, text: &str) {
        let _ = self.push.send(Message::Text(text.to_string().into()));
    }

    /// Pushes a close frame to the client.
    pub fn push_close(&self) {
        let _ = self.push.send(Message::Close(None));
    }

    /// Waits for the next text message sent by the client.
    pub async fn next_received(&mut self) -> String {
        timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for client message")
            .expect("server task ended")
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Starts a server that completes the handshake and then never reads.
///
/// Returns its socket URL. Writes from the client eventually stall once the
/// TCP buffers fill.
pub async fn start_unread_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let _ws_stream = accept_async(stream).await.expect("websocket upgrade");
        std::future::pending::<()>().await;
    });

    format!("ws://127.0.0.1:{port}/socket/websocket")
}

/// Waits for the next value on a handler channel.
pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for handler")
        .expect("handler channel closed")
}

/// Returns `true` if no value arrives on `rx` within `window`.
///
/// A channel whose senders were all dropped counts as silent.
pub async fn stays_silent<T>(rx: &mut mpsc::UnboundedReceiver<T>, window: Duration) -> bool {
    !matches!(timeout(window, rx.recv()).await, Ok(Some(_)))
}

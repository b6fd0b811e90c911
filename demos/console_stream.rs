//! Streams a user's console from a Screeps server.
//!
//! Usage:
//!
//! ```text
//! cargo run --example console_stream -- --url ws://localhost:21025/socket/websocket \
//!     --user <user-id> [--send "auth <token>"]... [--debug]
//! ```
//!
//! Every `--send` value is sent verbatim after connecting, in order. Ctrl+C
//! stops the stream and closes the socket.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use screeps_socket::{Connection, ConsoleLine, ConsoleSession, Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
struct Args {
    url: Option<String>,
    user: Option<String>,
    send: Vec<String>,
    debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Self {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--url" => args.url = iter.next(),
                "--user" => args.user = iter.next(),
                "--send" => args.send.extend(iter.next()),
                "--debug" => args.debug = true,
                other => eprintln!("Ignoring unknown argument: {other}"),
            }
        }
        args
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "screeps_socket=debug"
    } else {
        "screeps_socket=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let url = args
        .url
        .ok_or_else(|| Error::config("--url is required"))?;
    let user = args
        .user
        .ok_or_else(|| Error::config("--user is required"))?;

    let connection = Arc::new(Connection::builder().url(url).build()?);
    let session = ConsoleSession::new(user, connection.clone());

    session.listen(|envelope| {
        if let Some(error) = &envelope.error {
            eprintln!("[error] {error}");
        }
        for line in envelope.lines() {
            match line {
                ConsoleLine::Log(text) => println!("{text}"),
                ConsoleLine::Result(text) => println!("> {text}"),
            }
        }
    });

    connection.connect().await?;
    for message in args.send {
        connection.send(message).await?;
    }

    println!("Streaming console for {} (Ctrl+C to stop)", session.user_id());

    // Shutdown runs here, in the main flow, once either future resolves.
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        () = connection.wait_terminated() => println!("Server closed the connection"),
    }

    session.shutdown().await;
    Ok(())
}

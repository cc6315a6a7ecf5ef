//! cueboard server — holds the presentation script and the pasteboard
//! side of the protocol.
//!
//! Accepts one client at a time on a plain TCP listener, owns a
//! [`ServerSession`] in a single select loop, and goes back to
//! accepting when a session ends. Reconnection is therefore a fresh
//! session over a fresh connection; nothing is resumed.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use cueboard_core::{
    ServerEvent, ServerSession, SessionIo, TcpConnection, interest_for, pump,
};

/// Interval between liveness pings to the client.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Fallback script served when no file is given.
const SAMPLE_SCRIPT: &str = "<p id=\"clip-1\">Hello from cueboard.</p>";

#[derive(Parser, Debug)]
#[command(name = "cueboard-server", about = "Serve a presentation script to a cueboard client")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    listen: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9914)]
    port: u16,

    /// HTML script file to serve. A built-in sample is used if omitted.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Display name sent with the script. Defaults to the file name.
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let (html, name) = match &args.script {
        Some(path) => {
            let html = tokio::fs::read_to_string(path).await?;
            let name = args.name.clone().unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "script".to_string())
            });
            (html, name)
        }
        None => (
            SAMPLE_SCRIPT.to_string(),
            args.name.clone().unwrap_or_else(|| "sample".to_string()),
        ),
    };

    let listener = TcpListener::bind((args.listen.as_str(), args.port)).await?;
    info!(addr = %listener.local_addr()?, script = %name, "listening");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!(%peer, "client connected");
                if !serve_client(stream, &html, &name).await {
                    break;
                }
                info!("session ended; waiting for the next client");
            }
        }
    }

    info!("shutting down");
    Ok(())
}

/// Run one session to completion. Returns `false` when the process
/// should stop accepting.
async fn serve_client(stream: TcpStream, html: &str, name: &str) -> bool {
    let link = TcpConnection::from_stream(stream);
    let (tx, mut events) = mpsc::unbounded_channel();
    let mut session = ServerSession::new(link.clone(), tx);
    session.connection_opened();

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

    loop {
        while let Ok(event) = events.try_recv() {
            match event {
                ServerEvent::Connected => info!("session active"),
                ServerEvent::PingReceived => debug!("ping from client"),
                ServerEvent::ScriptRequested => {
                    info!(script = %name, "client asked for the script");
                    if let Err(err) = session.send_script(html, name) {
                        warn!(%err, "could not queue script");
                    }
                }
                ServerEvent::PasteRequested { text_id } => {
                    // The pasteboard itself lives outside this binary;
                    // acknowledge so the client can mark the clip done.
                    info!(%text_id, "paste requested");
                    if let Err(err) = session.notify_pasted(&text_id) {
                        warn!(%err, "could not queue paste confirmation");
                    }
                }
                ServerEvent::PeerError { message } => {
                    warn!(%message, "client reported an error");
                }
                ServerEvent::Failed(err) => {
                    error!(%err, "session failed");
                    return true;
                }
            }
        }
        if session.is_stopped() {
            return true;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.stop();
                return false;
            }
            _ = heartbeat.tick() => {
                if let Err(err) = session.send_ping() {
                    warn!(%err, "could not queue ping");
                }
            }
            ready = link.ready(interest_for(&session)) => match ready {
                Ok(ready) => pump(&link, ready, &mut session),
                Err(err) => {
                    link.mark_closed();
                    session.connection_errored(err);
                }
            }
        }
    }
}

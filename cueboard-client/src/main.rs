//! cueboard client — connects to a server, fetches the script, and
//! issues paste requests from stdin.
//!
//! One select loop owns the [`ClientSession`]: socket readiness is
//! pumped into it, stdin lines become intents, and typed events come
//! back out on the session's channel.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cueboard_core::{
    ClientEvent, ClientSession, ConnectionInfo, SessionIo, TcpConnection, interest_for, pump,
};

#[derive(Parser, Debug)]
#[command(name = "cueboard-client", about = "Fetch a script and drive pastes on a cueboard server")]
struct Args {
    /// Server host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 9914)]
    port: u16,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let info = ConnectionInfo::new(args.host, args.port);

    info!(server = %info, "connecting");
    let link = TcpConnection::connect(&info).await?;

    let (tx, mut events) = mpsc::unbounded_channel();
    let mut session = ClientSession::new(link.clone(), tx);
    session.connection_opened();

    println!("commands: ping | script | paste <textID> | error <message> | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        while let Ok(event) = events.try_recv() {
            match event {
                ClientEvent::Connected => {
                    info!("connected; requesting the script");
                    report(session.request_script());
                }
                ClientEvent::PingReceived => debug!("ping from server"),
                ClientEvent::ScriptReceived { html, filename } => {
                    println!("── script {filename} ({} bytes) ──", html.len());
                    println!("{html}");
                }
                ClientEvent::PasteConfirmed { text_id } => {
                    println!("pasted: {text_id}");
                }
                ClientEvent::PeerError { message } => {
                    eprintln!("server error: {message}");
                }
                ClientEvent::Failed(err) => {
                    error!(%err, "session failed");
                    return Ok(());
                }
            }
        }
        if session.is_stopped() {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => session.stop(),
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&mut session, &line),
                None => session.stop(),
            },
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

fn handle_line(session: &mut ClientSession<TcpConnection>, line: &str) {
    let line = line.trim();
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    match cmd {
        "" => {}
        "ping" => report(session.send_ping()),
        "script" => report(session.request_script()),
        "paste" if !rest.trim().is_empty() => report(session.paste_text(rest.trim())),
        "error" if !rest.trim().is_empty() => report(session.report_error(rest.trim())),
        "quit" | "exit" => session.stop(),
        _ => eprintln!("commands: ping | script | paste <textID> | error <message> | quit"),
    }
}

fn report(result: Result<(), cueboard_core::CueError>) {
    if let Err(err) = result {
        eprintln!("could not queue command: {err}");
    }
}

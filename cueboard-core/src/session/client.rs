//! Client-side protocol session.

use std::io;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::command::{Command, CommandKind, fields};
use crate::error::CueError;
use crate::frame::{FrameCollector, FrameEmitter};
use crate::session::phase::SessionPhase;
use crate::session::{SessionIo, StreamConnection, WRITE_CHUNK};

// ── ClientEvent ──────────────────────────────────────────────────

/// Typed events a [`ClientSession`] relays to its owner.
#[derive(Debug)]
pub enum ClientEvent {
    /// The connection to the server completed.
    Connected,

    /// The server's liveness ping arrived.
    PingReceived,

    /// The server delivered the presentation script.
    ScriptReceived { html: String, filename: String },

    /// The server placed the clip with `text_id` on its pasteboard.
    PasteConfirmed { text_id: String },

    /// The server reported a problem on its side. Not fatal; the
    /// session stays active.
    PeerError { message: String },

    /// Catastrophic failure. Emitted exactly once; the session is
    /// stopped and no further events follow.
    Failed(CueError),
}

// ── ClientSession ────────────────────────────────────────────────

/// Client endpoint of the cueboard protocol.
///
/// Owns its collector and emitter for the lifetime of the session and
/// holds, but does not own, the connection handle. Intents enqueue
/// commands on the emitter; the transport drains them through the
/// [`SessionIo`] readiness calls.
pub struct ClientSession<C: StreamConnection> {
    conn: Option<C>,
    phase: SessionPhase,
    collector: FrameCollector,
    emitter: FrameEmitter,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl<C: StreamConnection> ClientSession<C> {
    /// Bind a session to a connection and an event channel. The
    /// connection may not be open yet; the session stays `Idle` until
    /// [`connection_opened`](Self::connection_opened).
    pub fn new(conn: C, events: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self {
            conn: Some(conn),
            phase: SessionPhase::default(),
            collector: FrameCollector::new(),
            emitter: FrameEmitter::new(),
            events,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// The held transport handle, `None` once stopped.
    pub fn connection(&self) -> Option<&C> {
        self.conn.as_ref()
    }

    // ── Intents ──────────────────────────────────────────────────

    /// Best-effort liveness probe. No reply correlation.
    pub fn send_ping(&mut self) -> Result<(), CueError> {
        self.enqueue(Command::ping())
    }

    /// Ask the server to (re)send the presentation script.
    pub fn request_script(&mut self) -> Result<(), CueError> {
        self.enqueue(Command::script_request())
    }

    /// Ask the server to place the clip with `text_id` on its
    /// pasteboard.
    pub fn paste_text(&mut self, text_id: &str) -> Result<(), CueError> {
        self.enqueue(Command::paste_request(text_id))
    }

    /// Tell the server something went wrong on this end. Non-fatal for
    /// both sides.
    pub fn report_error(&mut self, message: &str) -> Result<(), CueError> {
        self.enqueue(Command::error(message))
    }

    /// Stop the session. Idempotent, callable from any state; resets
    /// the collector and emitter and drops the connection reference.
    /// Emits nothing.
    pub fn stop(&mut self) {
        if self.phase.is_stopped() {
            return;
        }
        self.teardown();
    }

    // ── Internals ────────────────────────────────────────────────

    fn enqueue(&mut self, cmd: Command) -> Result<(), CueError> {
        if self.phase.is_stopped() {
            return Err(CueError::SessionStopped);
        }
        let bytes = cmd.to_bytes()?;
        self.emitter.enqueue(&bytes)
    }

    fn emit(&mut self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Funnel for every fatal condition: one terminal event, then the
    /// same teardown as an explicit stop.
    fn fail(&mut self, err: CueError) {
        if self.phase.is_stopped() {
            return;
        }
        self.emit(ClientEvent::Failed(err));
        self.teardown();
    }

    fn teardown(&mut self) {
        self.phase.force_stop();
        self.collector.reset();
        self.emitter.reset();
        self.conn = None;
    }

    fn dispatch_frame(&mut self, body: &Bytes) {
        let cmd = match Command::from_bytes(body) {
            Ok(cmd) => cmd,
            Err(err) => {
                // Protocol desync is unrecoverable.
                self.fail(err);
                return;
            }
        };

        match cmd.kind() {
            Some(CommandKind::Ping) => self.emit(ClientEvent::PingReceived),
            Some(CommandKind::Script) => {
                match (cmd.str_field(fields::HTML), cmd.str_field(fields::FILENAME)) {
                    (Ok(html), Ok(filename)) => {
                        let event = ClientEvent::ScriptReceived {
                            html: html.to_string(),
                            filename: filename.to_string(),
                        };
                        self.emit(event);
                    }
                    (Err(err), _) | (_, Err(err)) => self.fail(err),
                }
            }
            Some(CommandKind::PasteConfirm) => match cmd.str_field(fields::TEXT_ID) {
                Ok(text_id) => {
                    let event = ClientEvent::PasteConfirmed {
                        text_id: text_id.to_string(),
                    };
                    self.emit(event);
                }
                Err(err) => self.fail(err),
            },
            Some(CommandKind::Error) => match cmd.str_field(fields::MESSAGE) {
                Ok(message) => {
                    let event = ClientEvent::PeerError {
                        message: message.to_string(),
                    };
                    self.emit(event);
                }
                Err(err) => self.fail(err),
            },
            // Unknown names and server-bound commands are tolerated so
            // newer peers can speak extensions to older ones.
            _ => {
                let err = CueError::Unrecognized(cmd.name().to_string());
                tracing::warn!(%err, "ignoring command outside the client vocabulary");
            }
        }
    }
}

impl<C: StreamConnection> SessionIo for ClientSession<C> {
    fn connection_opened(&mut self) {
        if self.phase.is_idle() {
            let _ = self.phase.begin_connect();
        }
        if self.phase.activate().is_ok() {
            self.emit(ClientEvent::Connected);
        }
    }

    fn data_received(&mut self, bytes: &[u8]) {
        if self.phase.is_stopped() {
            return;
        }
        let mut frames = Vec::new();
        let result = self.collector.write(bytes, |frame| frames.push(frame));
        for frame in &frames {
            if self.phase.is_stopped() {
                return;
            }
            self.dispatch_frame(frame);
        }
        if let Err(err) = result {
            self.fail(err);
        }
    }

    fn space_available(&mut self) {
        if self.phase.is_stopped() {
            return;
        }
        let Some(conn) = self.conn.as_mut() else {
            return;
        };
        let mut buf = [0u8; WRITE_CHUNK];
        let mut write_err = None;
        loop {
            let n = self.emitter.read(&mut buf);
            if n == 0 {
                break;
            }
            match conn.try_write(&buf[..n]) {
                Ok(0) => break,
                Ok(written) => {
                    self.emitter.acknowledge(written);
                    if written < n {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    write_err = Some(err);
                    break;
                }
            }
        }
        if let Some(err) = write_err {
            self.fail(err.into());
        }
    }

    fn connection_closed(&mut self) {
        self.fail(CueError::ConnectionClosed);
    }

    fn connection_errored(&mut self, err: io::Error) {
        self.fail(err.into());
    }

    fn has_pending_output(&self) -> bool {
        self.emitter.has_pending_data()
    }

    fn is_stopped(&self) -> bool {
        self.phase.is_stopped()
    }
}

// ── Tests ────────────────────────────────────────────────────────

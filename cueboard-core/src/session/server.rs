//! Server-side protocol session.

use std::io;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::command::{Command, CommandKind, fields};
use crate::error::CueError;
use crate::frame::{FrameCollector, FrameEmitter};
use crate::session::phase::SessionPhase;
use crate::session::{SessionIo, StreamConnection, WRITE_CHUNK};

// ── ServerEvent ──────────────────────────────────────────────────

/// Typed events a [`ServerSession`] relays to its owner.
#[derive(Debug)]
pub enum ServerEvent {
    /// The connection to the client completed.
    Connected,

    /// The client's liveness ping arrived.
    PingReceived,

    /// The client asked for the presentation script.
    ScriptRequested,

    /// The client asked to put the clip with `text_id` on the
    /// pasteboard.
    PasteRequested { text_id: String },

    /// The client reported a problem on its side. Not fatal; the
    /// session stays active.
    PeerError { message: String },

    /// Catastrophic failure. Emitted exactly once; the session is
    /// stopped and no further events follow.
    Failed(CueError),
}

// ── ServerSession ────────────────────────────────────────────────

/// Server endpoint of the cueboard protocol. Mirror of
/// [`ClientSession`](crate::session::ClientSession) with the
/// server-side vocabulary.
pub struct ServerSession<C: StreamConnection> {
    conn: Option<C>,
    phase: SessionPhase,
    collector: FrameCollector,
    emitter: FrameEmitter,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl<C: StreamConnection> ServerSession<C> {
    /// Bind a session to a connection and an event channel. The
    /// connection may not be open yet; the session stays `Idle` until
    /// [`connection_opened`](Self::connection_opened).
    pub fn new(conn: C, events: mpsc::UnboundedSender<ServerEvent>) -> Self {
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

    /// Whether the transport is currently open.
    ///
    /// Delegates to the connection rather than the session's own phase
    /// flag, so callers can tell "session object alive" apart from
    /// "link up".
    pub fn is_connected(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.is_open())
    }

    // ── Intents ──────────────────────────────────────────────────

    /// Best-effort liveness probe. No reply correlation.
    pub fn send_ping(&mut self) -> Result<(), CueError> {
        self.enqueue(Command::ping())
    }

    /// Tell the client the clip with `text_id` reached the pasteboard.
    pub fn notify_pasted(&mut self, text_id: &str) -> Result<(), CueError> {
        self.enqueue(Command::paste_confirm(text_id))
    }

    /// Deliver the presentation script with a display name.
    pub fn send_script(&mut self, html: &str, name: &str) -> Result<(), CueError> {
        self.enqueue(Command::script(html, name))
    }

    /// Tell the client about a problem. Non-fatal for both sides.
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

    fn emit(&mut self, event: ServerEvent) {
        let _ = self.events.send(event);
    }

    /// Funnel for every fatal condition: one terminal event, then the
    /// same teardown as an explicit stop.
    fn fail(&mut self, err: CueError) {
        if self.phase.is_stopped() {
            return;
        }
        self.emit(ServerEvent::Failed(err));
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
            Some(CommandKind::Ping) => self.emit(ServerEvent::PingReceived),
            Some(CommandKind::ScriptRequest) => self.emit(ServerEvent::ScriptRequested),
            Some(CommandKind::PasteRequest) => match cmd.str_field(fields::TEXT_ID) {
                Ok(text_id) => {
                    let event = ServerEvent::PasteRequested {
                        text_id: text_id.to_string(),
                    };
                    self.emit(event);
                }
                Err(err) => self.fail(err),
            },
            Some(CommandKind::Error) => match cmd.str_field(fields::MESSAGE) {
                Ok(message) => {
                    let event = ServerEvent::PeerError {
                        message: message.to_string(),
                    };
                    self.emit(event);
                }
                Err(err) => self.fail(err),
            },
            // Unknown names and client-bound commands are tolerated so
            // newer peers can speak extensions to older ones.
            _ => {
                let err = CueError::Unrecognized(cmd.name().to_string());
                tracing::warn!(%err, "ignoring command outside the server vocabulary");
            }
        }
    }
}

impl<C: StreamConnection> SessionIo for ServerSession<C> {
    fn connection_opened(&mut self) {
        if self.phase.is_idle() {
            let _ = self.phase.begin_connect();
        }
        if self.phase.activate().is_ok() {
            self.emit(ServerEvent::Connected);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::MockLink;

    fn session() -> (
        ServerSession<MockLink>,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ServerSession::new(MockLink::new(), tx), rx)
    }

    fn frame_for(cmd: &Command) -> Vec<u8> {
        let body = cmd.to_bytes().unwrap();
        let mut wire = (body.len() as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(&body);
        wire
    }

    #[test]
    fn connected_event_on_open() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        assert!(s.phase().is_active());
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::Connected)));
    }

    #[test]
    fn script_request_dispatch() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();

        s.data_received(&frame_for(&Command::script_request()));
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::ScriptRequested)));
        assert!(s.phase().is_active());
    }

    #[test]
    fn paste_request_dispatch() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();

        s.data_received(&frame_for(&Command::paste_request("clip-42")));
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerEvent::PasteRequested { text_id }) if text_id == "clip-42"
        ));
    }

    #[test]
    fn paste_request_missing_text_id_is_fatal() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();

        s.data_received(&frame_for(&Command::new("paste-request")));
        match rx.try_recv().unwrap() {
            ServerEvent::Failed(CueError::MissingMetadata { command, field }) => {
                assert_eq!(command, "paste-request");
                assert_eq!(field, "textID");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(s.is_stopped());
    }

    #[test]
    fn client_error_report_is_not_fatal() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();

        s.data_received(&frame_for(&Command::error("client hiccup")));
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerEvent::PeerError { message }) if message == "client hiccup"
        ));
        assert!(s.phase().is_active());
    }

    #[test]
    fn unrecognized_command_keeps_session_active() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();

        s.data_received(&frame_for(&Command::new("confetti")));
        assert!(rx.try_recv().is_err());
        assert!(s.phase().is_active());
    }

    #[test]
    fn is_connected_tracks_the_transport_not_the_phase() {
        let (mut s, _rx) = session();
        // Phase is still Idle, but the link reports open.
        assert!(s.phase().is_idle());
        assert!(s.is_connected());

        s.connection_opened();
        assert!(s.is_connected());

        s.stop();
        assert!(!s.is_connected());
    }

    #[test]
    fn multiple_frames_dispatch_in_order() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();

        let mut wire = frame_for(&Command::ping());
        wire.extend_from_slice(&frame_for(&Command::script_request()));
        wire.extend_from_slice(&frame_for(&Command::paste_request("c1")));
        s.data_received(&wire);

        assert!(matches!(rx.try_recv(), Ok(ServerEvent::PingReceived)));
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::ScriptRequested)));
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerEvent::PasteRequested { text_id }) if text_id == "c1"
        ));
    }

    #[test]
    fn failure_after_valid_frames_still_dispatches_them() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();

        let mut wire = frame_for(&Command::ping());
        wire.extend_from_slice(&7u32.to_be_bytes());
        wire.extend_from_slice(b"garbage");
        s.data_received(&wire);

        assert!(matches!(rx.try_recv(), Ok(ServerEvent::PingReceived)));
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::Failed(_))));
        assert!(rx.try_recv().is_err());
        assert!(s.is_stopped());
    }

    #[test]
    fn stop_resets_and_releases() {
        let (mut s, mut rx) = session();
        s.connection_opened();
        rx.try_recv().unwrap();
        s.send_ping().unwrap();
        assert!(s.has_pending_output());

        s.stop();
        assert!(!s.has_pending_output());
        assert!(s.connection().is_none());
        assert!(rx.try_recv().is_err());

        s.stop();
        assert!(s.is_stopped());
    }

    #[test]
    fn script_delivery_reaches_the_wire() {
        let (mut s, _rx) = session();
        s.connection_opened();
        s.send_script("<p>hi</p>", "deck1").unwrap();
        s.space_available();

        let written = &s.connection().unwrap().written;
        let mut collector = FrameCollector::new();
        let mut decoded = Vec::new();
        collector
            .write(written, |body| {
                decoded.push(Command::from_bytes(&body).unwrap());
            })
            .unwrap();
        assert_eq!(decoded, vec![Command::script("<p>hi</p>", "deck1")]);
    }
}

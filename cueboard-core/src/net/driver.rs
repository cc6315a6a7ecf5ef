//! Readiness pump — serializes transport events onto a session's
//! single execution context.
//!
//! Callers loop on `ready(interest_for(&session))` and hand each result
//! to [`pump`]. No task is spawned and nothing blocks: the session's
//! ordering guarantees hold because every event goes through the one
//! loop that owns it.

use tokio::io::{Interest, Ready};

use crate::net::TcpConnection;
use crate::session::SessionIo;

/// Read buffer size for one pump pass.
const READ_CHUNK: usize = 8 * 1024;

/// The interest set the readiness loop should wait on: always readable,
/// plus writable while the session has framed bytes queued.
pub fn interest_for<S: SessionIo>(session: &S) -> Interest {
    if session.has_pending_output() {
        Interest::READABLE | Interest::WRITABLE
    } else {
        Interest::READABLE
    }
}

/// Apply one readiness event to the session.
///
/// Drains readable bytes into `data_received`, routes close/error to
/// their handlers (marking the shared handle closed so `is_connected`
/// observers agree), and offers write space when the socket reports it.
pub fn pump<S: SessionIo>(link: &TcpConnection, ready: Ready, session: &mut S) {
    if ready.is_readable() || ready.is_read_closed() {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if session.is_stopped() {
                return;
            }
            match link.try_read(&mut buf) {
                Ok(0) => {
                    link.mark_closed();
                    session.connection_closed();
                    return;
                }
                Ok(n) => session.data_received(&buf[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    link.mark_closed();
                    session.connection_errored(err);
                    return;
                }
            }
        }
    }

    if ready.is_writable() && !session.is_stopped() {
        session.space_available();
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct FakeIo {
        pending: bool,
    }

    impl SessionIo for FakeIo {
        fn connection_opened(&mut self) {}
        fn data_received(&mut self, _bytes: &[u8]) {}
        fn space_available(&mut self) {}
        fn connection_closed(&mut self) {}
        fn connection_errored(&mut self, _err: io::Error) {}
        fn has_pending_output(&self) -> bool {
            self.pending
        }
        fn is_stopped(&self) -> bool {
            false
        }
    }

    #[test]
    fn interest_follows_pending_output() {
        let idle = interest_for(&FakeIo { pending: false });
        assert!(idle.is_readable());
        assert!(!idle.is_writable());

        let busy = interest_for(&FakeIo { pending: true });
        assert!(busy.is_readable());
        assert!(busy.is_writable());
    }
}

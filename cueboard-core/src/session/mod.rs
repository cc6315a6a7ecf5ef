//! Protocol sessions — the mirrored client/server state machines.
//!
//! A session owns one [`FrameCollector`](crate::frame::FrameCollector),
//! one [`FrameEmitter`](crate::frame::FrameEmitter), and a handle to a
//! connection it does not own. Transport readiness events are fed in
//! through the [`SessionIo`] surface; typed protocol events come out on
//! an unbounded channel, synchronously and in arrival order. All calls
//! for one session must come from a single execution context.

mod client;
mod phase;
mod server;

pub use client::{ClientEvent, ClientSession};
pub use phase::SessionPhase;
pub use server::{ServerEvent, ServerSession};

use std::io;

/// Stack buffer size for one emitter read/write cycle.
pub(crate) const WRITE_CHUNK: usize = 8 * 1024;

/// The transport boundary a session writes to.
///
/// The session holds a reference to the connection but never tears it
/// down; on stop it simply drops its handle. Implementations must be
/// non-blocking: a write that cannot proceed returns `Ok(0)` or
/// `ErrorKind::WouldBlock`.
pub trait StreamConnection {
    /// True while the transport layer reports an open link.
    fn is_open(&self) -> bool;

    /// Attempt a non-blocking write, returning the bytes accepted.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// Transport-event surface shared by both session types, so one
/// readiness loop can drive either endpoint.
pub trait SessionIo {
    /// The underlying connection reported open.
    fn connection_opened(&mut self);

    /// Raw bytes arrived from the transport.
    fn data_received(&mut self, bytes: &[u8]);

    /// The transport can accept more outbound bytes.
    fn space_available(&mut self);

    /// The peer closed the connection.
    fn connection_closed(&mut self);

    /// The transport reported an error.
    fn connection_errored(&mut self, err: io::Error);

    /// True iff framed bytes are waiting to be written.
    fn has_pending_output(&self) -> bool;

    /// True once the session reached its terminal state.
    fn is_stopped(&self) -> bool;
}

// ── Test transport ───────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use super::StreamConnection;
    use std::io;

    /// In-memory transport double. `quota` caps the bytes accepted per
    /// `try_write` call to exercise short-write handling.
    pub struct MockLink {
        pub open: bool,
        pub written: Vec<u8>,
        pub quota: usize,
    }

    impl MockLink {
        pub fn new() -> Self {
            Self {
                open: true,
                written: Vec::new(),
                quota: usize::MAX,
            }
        }

        pub fn with_quota(quota: usize) -> Self {
            Self {
                quota,
                ..Self::new()
            }
        }
    }

    impl StreamConnection for MockLink {
        fn is_open(&self) -> bool {
            self.open
        }

        fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.open {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link closed"));
            }
            if self.quota == 0 {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.quota);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }
}

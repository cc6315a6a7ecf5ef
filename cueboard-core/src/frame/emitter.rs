//! Outbound framing — a pull-based byte source tolerant of short writes.

use bytes::{Buf, BytesMut};

use crate::error::CueError;
use crate::frame::MAX_FRAME_LEN;

/// Frames outbound payloads and serves the bytes on demand.
///
/// Transports write asynchronously and partially, so consumption is split
/// in two phases: [`read`](Self::read) copies from the front of the
/// pending buffer without consuming, and [`acknowledge`](Self::acknowledge)
/// removes only the bytes the transport actually accepted. A short write
/// therefore re-offers the unsent tail on the next cycle, and confirmed
/// bytes are never offered twice.
#[derive(Debug)]
pub struct FrameEmitter {
    pending: BytesMut,
}

impl FrameEmitter {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Frame `payload` and append it to the pending output. Never blocks.
    ///
    /// Fails only when the payload itself exceeds the frame cap, which
    /// would produce a prefix no peer collector accepts.
    pub fn enqueue(&mut self, payload: &[u8]) -> Result<(), CueError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(CueError::FrameTooLarge {
                declared: payload.len(),
                max: MAX_FRAME_LEN,
            });
        }
        self.pending
            .extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.pending.extend_from_slice(payload);
        Ok(())
    }

    /// True iff framed bytes are waiting to be written.
    pub fn has_pending_data(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of framed bytes waiting to be written.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Copy up to `buf.len()` bytes from the front of the pending buffer
    /// without consuming them. Returns the count copied, 0 when idle.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        n
    }

    /// Drop the first `consumed` pending bytes, reflecting what the
    /// transport actually accepted. Counts beyond the pending length are
    /// clamped.
    pub fn acknowledge(&mut self, consumed: usize) {
        let n = consumed.min(self.pending.len());
        self.pending.advance(n);
    }

    /// Discard all pending output.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

impl Default for FrameEmitter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut out = (body.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    /// Drain everything through read/acknowledge with a given chunk size.
    fn drain(emitter: &mut FrameEmitter, chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = emitter.read(&mut buf);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            emitter.acknowledge(n);
        }
        out
    }

    #[test]
    fn wire_format_is_prefix_plus_body() {
        let mut e = FrameEmitter::new();
        e.enqueue(b"payload").unwrap();
        assert_eq!(drain(&mut e, 64), framed(b"payload"));
    }

    #[test]
    fn starts_idle() {
        let e = FrameEmitter::new();
        assert!(!e.has_pending_data());
        let mut buf = [0u8; 8];
        assert_eq!(e.read(&mut buf), 0);
    }

    #[test]
    fn read_does_not_consume() {
        let mut e = FrameEmitter::new();
        e.enqueue(b"abc").unwrap();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        let n1 = e.read(&mut a);
        let n2 = e.read(&mut b);
        assert_eq!(n1, n2);
        assert_eq!(a[..n1], b[..n2]);
        assert_eq!(e.pending_len(), n1);
    }

    #[test]
    fn acknowledge_advances_past_short_write() {
        let mut e = FrameEmitter::new();
        e.enqueue(b"0123456789").unwrap();
        let total = e.pending_len();

        let mut buf = [0u8; 64];
        let n = e.read(&mut buf);
        assert_eq!(n, total);

        // Transport only took 5 bytes; the rest must be re-offered.
        e.acknowledge(5);
        let mut rest = [0u8; 64];
        let m = e.read(&mut rest);
        assert_eq!(m, total - 5);
        assert_eq!(rest[..m], buf[5..n]);
    }

    #[test]
    fn chunking_is_transparent() {
        // The observable byte sequence must not depend on how the reader
        // fragments its pulls.
        let payloads: [&[u8]; 3] = [b"alpha", b"", b"a longer third payload"];
        let mut expected = Vec::new();
        for p in payloads {
            expected.extend_from_slice(&framed(p));
        }

        for chunk in [1, 2, 3, 7, 16, 1024] {
            let mut e = FrameEmitter::new();
            for p in payloads {
                e.enqueue(p).unwrap();
            }
            assert_eq!(drain(&mut e, chunk), expected, "chunk size {chunk}");
            assert!(!e.has_pending_data());
        }
    }

    #[test]
    fn enqueue_order_is_preserved() {
        let mut e = FrameEmitter::new();
        e.enqueue(b"one").unwrap();
        e.enqueue(b"two").unwrap();
        let mut expected = framed(b"one");
        expected.extend_from_slice(&framed(b"two"));
        assert_eq!(drain(&mut e, 4), expected);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut e = FrameEmitter::new();
        let huge = vec![0u8; MAX_FRAME_LEN + 1];
        assert!(matches!(
            e.enqueue(&huge),
            Err(CueError::FrameTooLarge { .. })
        ));
        assert!(!e.has_pending_data());
    }

    #[test]
    fn acknowledge_clamps_to_pending() {
        let mut e = FrameEmitter::new();
        e.enqueue(b"xy").unwrap();
        e.acknowledge(1000);
        assert!(!e.has_pending_data());
    }

    #[test]
    fn reset_discards_pending() {
        let mut e = FrameEmitter::new();
        e.enqueue(b"gone").unwrap();
        e.reset();
        assert!(!e.has_pending_data());
        assert_eq!(e.pending_len(), 0);
    }
}

//! Inbound deframing — reassembles complete frames from partial reads.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::CueError;
use crate::frame::{LEN_PREFIX_LEN, MAX_FRAME_LEN};

/// Collects raw inbound bytes and surfaces complete frame bodies.
///
/// Bytes are appended with [`write`](Self::write); every frame completed
/// by the new bytes is handed to the callback, one frame per invocation,
/// in arrival order, before `write` returns. Bytes belonging to an
/// incomplete trailing frame stay buffered for the next call.
#[derive(Debug)]
pub struct FrameCollector {
    buf: BytesMut,
    max_frame_len: usize,
}

impl FrameCollector {
    pub fn new() -> Self {
        Self::with_max_frame_len(MAX_FRAME_LEN)
    }

    /// Collector with a custom frame cap, mostly for tests and
    /// constrained deployments.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4 * 1024),
            max_frame_len,
        }
    }

    /// Append `bytes` and extract as many complete frames as possible.
    ///
    /// Returns the number of bytes consumed, which is always
    /// `bytes.len()` on success. A length prefix above the configured cap
    /// fails with [`CueError::FrameTooLarge`] as soon as the prefix is
    /// readable; the oversized claim is never buffered while waiting for
    /// a body that may never arrive. After that error the stream is
    /// assumed corrupt — the only recovery is [`reset`](Self::reset) or
    /// session teardown.
    pub fn write<F>(&mut self, bytes: &[u8], mut on_frame: F) -> Result<usize, CueError>
    where
        F: FnMut(Bytes),
    {
        self.buf.extend_from_slice(bytes);

        loop {
            if self.buf.len() < LEN_PREFIX_LEN {
                break;
            }
            let declared = u32::from_be_bytes(
                self.buf[..LEN_PREFIX_LEN]
                    .try_into()
                    .map_err(|_| CueError::Unparsable("length prefix".to_string()))?,
            ) as usize;
            if declared > self.max_frame_len {
                return Err(CueError::FrameTooLarge {
                    declared,
                    max: self.max_frame_len,
                });
            }
            if self.buf.len() < LEN_PREFIX_LEN + declared {
                break;
            }
            self.buf.advance(LEN_PREFIX_LEN);
            let body = self.buf.split_to(declared).freeze();
            on_frame(body);
        }

        Ok(bytes.len())
    }

    /// Number of bytes buffered for a not-yet-complete frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Discard all buffered partial state. Used on reconnect or stop.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

impl Default for FrameCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

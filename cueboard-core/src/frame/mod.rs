//! Wire framing for the cueboard protocol.
//!
//! Every message travels as one frame: a 4-byte big-endian unsigned
//! length prefix followed by exactly that many body bytes. The
//! [`FrameCollector`] reassembles frames from an arbitrarily fragmented
//! inbound byte stream; the [`FrameEmitter`] turns outbound payloads into
//! framed bytes served through a two-phase read/acknowledge cycle so a
//! transport that performs short writes never loses or duplicates data.
//!
//! Neither type is synchronized internally. All calls for one stream must
//! come from the same execution context.

mod collector;
mod emitter;

pub use collector::FrameCollector;
pub use emitter::FrameEmitter;

/// Width of the big-endian length prefix on every frame.
pub const LEN_PREFIX_LEN: usize = 4;

/// Upper bound on a single frame body. A prefix declaring more than this
/// is treated as stream corruption.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

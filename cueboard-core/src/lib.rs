//! # cueboard-core
//!
//! Core protocol library for the cueboard remote-pasteboard tool.
//!
//! This crate contains:
//! - **Framing**: `FrameCollector` / `FrameEmitter` for incremental
//!   deframing and two-phase (read/acknowledge) outbound buffering
//! - **Commands**: `Command` + `CommandKind`, the named key/value
//!   message unit and its byte codec
//! - **Sessions**: `ClientSession` and `ServerSession`, mirrored state
//!   machines that turn a raw byte stream into typed protocol events
//! - **Net**: `TcpConnection` and the readiness pump that drives a
//!   session from one execution context
//! - **Error**: `CueError` — typed, `thiserror`-based error hierarchy

pub mod command;
pub mod error;
pub mod frame;
pub mod net;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use command::{Command, CommandKind};
pub use error::CueError;
pub use frame::{FrameCollector, FrameEmitter, LEN_PREFIX_LEN, MAX_FRAME_LEN};
pub use net::{ConnectionInfo, TcpConnection, interest_for, pump};
pub use session::{
    ClientEvent, ClientSession, ServerEvent, ServerSession, SessionIo, SessionPhase,
    StreamConnection,
};

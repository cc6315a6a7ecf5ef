//! Domain-specific error types for the cueboard protocol.
//!
//! All fallible operations return `Result<T, CueError>`.
//! No panics on invalid input — every error is typed and recoverable
//! by the caller, even when it is fatal to the session that raised it.

use thiserror::Error;

/// The canonical error type for the cueboard protocol.
#[derive(Debug, Error)]
pub enum CueError {
    // ── Codec Errors ─────────────────────────────────────────────
    /// A frame body was not well-formed command data, or the command
    /// name was missing or empty.
    #[error("unparsable command: {0}")]
    Unparsable(String),

    /// A command parsed but lacked a field its type requires.
    #[error("command {command:?} is missing required field {field:?}")]
    MissingMetadata {
        command: String,
        field: &'static str,
    },

    /// A command name outside this endpoint's vocabulary.
    ///
    /// Sessions treat this as non-fatal and log-only so newer peers can
    /// speak extensions to older ones.
    #[error("unrecognized command name: {0:?}")]
    Unrecognized(String),

    /// Encoding an outbound command failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Framing Errors ───────────────────────────────────────────
    /// A length prefix declared a frame larger than the configured cap.
    /// The stream is assumed corrupt and the session torn down.
    #[error("frame too large: {declared} bytes (max {max})")]
    FrameTooLarge { declared: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The transport layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Session Errors ───────────────────────────────────────────
    /// An operation was attempted on a stopped session.
    #[error("session is stopped")]
    SessionStopped,

    /// A session state transition violated the lifecycle rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for CueError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        CueError::ChannelClosed
    }
}

impl From<serde_json::Error> for CueError {
    fn from(e: serde_json::Error) -> Self {
        CueError::Unparsable(e.to_string())
    }
}

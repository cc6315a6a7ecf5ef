//! Protocol command unit and its byte codec.
//!
//! A [`Command`] is a name plus a flat key/value payload, carried as a
//! frame body in compact JSON: `{"command": <name>, "payload": {...}}`.
//! The encoding is self-describing, so the codec can distinguish bytes
//! that are not a command at all (`Unparsable`) from a well-formed
//! command missing a required field (`MissingMetadata`). Names outside an
//! endpoint's vocabulary are a session-level concern (`Unrecognized`),
//! not a codec failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::CueError;

/// Payload field names used by the known command kinds.
pub mod fields {
    pub const HTML: &str = "html";
    pub const FILENAME: &str = "filename";
    pub const TEXT_ID: &str = "textID";
    pub const MESSAGE: &str = "message";
}

// ── CommandKind ──────────────────────────────────────────────────

/// All command names understood by the cueboard protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Liveness probe, either direction. No reply correlation.
    Ping,
    /// Client asks the server to (re)send the presentation script.
    ScriptRequest,
    /// Server delivers the script HTML with a display filename.
    Script,
    /// Client asks the server to paste the clip with `textID`.
    PasteRequest,
    /// Server confirms the clip with `textID` reached the pasteboard.
    PasteConfirm,
    /// Non-fatal application error report, either direction.
    Error,
}

impl CommandKind {
    /// Look up a wire name. `None` means the name is outside the
    /// vocabulary and the session decides how to treat it.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ping" => Some(CommandKind::Ping),
            "script-request" => Some(CommandKind::ScriptRequest),
            "script" => Some(CommandKind::Script),
            "paste-request" => Some(CommandKind::PasteRequest),
            "paste-confirm" => Some(CommandKind::PasteConfirm),
            "error" => Some(CommandKind::Error),
            _ => None,
        }
    }

    /// The wire name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Ping => "ping",
            CommandKind::ScriptRequest => "script-request",
            CommandKind::Script => "script",
            CommandKind::PasteRequest => "paste-request",
            CommandKind::PasteConfirm => "paste-confirm",
            CommandKind::Error => "error",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Command ──────────────────────────────────────────────────────

/// A named, payload-bearing message exchanged between sessions.
///
/// `name` is non-empty for any valid command; payload keys are unique and
/// order-independent. `from_bytes(to_bytes(c)) == c` holds for every
/// valid command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "command")]
    name: String,

    #[serde(default)]
    payload: Map<String, Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Map::new(),
        }
    }

    // ── Builders for the known vocabulary ────────────────────────

    pub fn ping() -> Self {
        Self::new(CommandKind::Ping.name())
    }

    pub fn script_request() -> Self {
        Self::new(CommandKind::ScriptRequest.name())
    }

    pub fn script(html: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::new(CommandKind::Script.name())
            .with_str(fields::HTML, html)
            .with_str(fields::FILENAME, filename)
    }

    pub fn paste_request(text_id: impl Into<String>) -> Self {
        Self::new(CommandKind::PasteRequest.name()).with_str(fields::TEXT_ID, text_id)
    }

    pub fn paste_confirm(text_id: impl Into<String>) -> Self {
        Self::new(CommandKind::PasteConfirm.name()).with_str(fields::TEXT_ID, text_id)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(CommandKind::Error.name()).with_str(fields::MESSAGE, message)
    }

    /// Add a string payload field.
    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), Value::String(value.into()));
        self
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The vocabulary entry for this command's name, if any.
    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::from_name(&self.name)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Fetch a required string field.
    ///
    /// Absent or non-string values fail with
    /// [`CueError::MissingMetadata`], which sessions treat as fatal for
    /// commands inside their vocabulary.
    pub fn str_field(&self, field: &'static str) -> Result<&str, CueError> {
        self.payload
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| CueError::MissingMetadata {
                command: self.name.clone(),
                field,
            })
    }

    // ── Codec ────────────────────────────────────────────────────

    /// Encode to a frame body. Deterministic and total for any valid
    /// command: payload keys serialize in sorted order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CueError> {
        serde_json::to_vec(self).map_err(|e| CueError::Encoding(e.to_string()))
    }

    /// Decode a frame body.
    ///
    /// Bytes that are not a well-formed command object, or that carry a
    /// missing/empty name, fail with [`CueError::Unparsable`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CueError> {
        let cmd: Command = serde_json::from_slice(bytes)?;
        if cmd.name.is_empty() {
            return Err(CueError::Unparsable("empty command name".to_string()));
        }
        Ok(cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} fields)", self.name, self.payload.len())
    }
}

// ── Tests ────────────────────────────────────────────────────────

//! Session lifecycle state machine shared by both endpoints.
//!
//! Provides a `SessionPhase` enum with validated transitions that return
//! `Result` instead of panicking.

use std::time::Instant;

use crate::error::CueError;

/// The current phase of a protocol session.
///
/// ```text
///  Idle ──► Connecting ──► Active ──► Stopped
///    │           │                       ▲
///    └───────────┴───────────────────────┘
/// ```
///
/// `Stopped` is terminal: a stopped session never re-emits events and
/// never leaves the state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Constructed, transport not yet started. Initial state.
    #[default]
    Idle,

    /// Transport initiated but not yet reported open.
    Connecting,

    /// Transport open; commands flow in both directions.
    Active {
        /// When the session entered the `Active` state.
        since: Instant,
    },

    /// Terminal state, reached by explicit stop or catastrophic failure.
    Stopped,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Active { .. } => write!(f, "Active"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

impl SessionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns `true` when protocol traffic may flow.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Returns `true` once the session has reached its terminal state.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// How long the session has been `Active`, `None` in any other phase.
    pub fn active_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Active { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Idle`.
    pub fn begin_connect(&mut self) -> Result<(), CueError> {
        match self {
            Self::Idle => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(CueError::ProtocolViolation(
                "cannot begin connecting: not in Idle state",
            )),
        }
    }

    /// Transition to `Active`.
    ///
    /// Valid from: `Connecting`.
    pub fn activate(&mut self) -> Result<(), CueError> {
        match self {
            Self::Connecting => {
                *self = Self::Active {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(CueError::ProtocolViolation(
                "cannot activate: not in Connecting state",
            )),
        }
    }

    /// Force the terminal state regardless of the current phase.
    ///
    /// Idempotent; used for both explicit stop and fatal failures.
    pub fn force_stop(&mut self) {
        *self = Self::Stopped;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = SessionPhase::default();
        assert!(phase.is_idle());

        phase.begin_connect().unwrap();
        assert_eq!(phase, SessionPhase::Connecting);

        phase.activate().unwrap();
        assert!(phase.is_active());
        assert!(phase.active_duration().is_some());

        phase.force_stop();
        assert!(phase.is_stopped());
    }

    #[test]
    fn invalid_transition_connect_when_active() {
        let mut phase = SessionPhase::Active {
            since: Instant::now(),
        };
        assert!(phase.begin_connect().is_err());
    }

    #[test]
    fn invalid_transition_activate_from_idle() {
        let mut phase = SessionPhase::Idle;
        assert!(phase.activate().is_err());
    }

    #[test]
    fn stopped_is_terminal() {
        let mut phase = SessionPhase::Stopped;
        assert!(phase.begin_connect().is_err());
        assert!(phase.activate().is_err());

        phase.force_stop();
        assert!(phase.is_stopped());
    }

    #[test]
    fn force_stop_from_any_state() {
        for mut phase in [
            SessionPhase::Idle,
            SessionPhase::Connecting,
            SessionPhase::Active {
                since: Instant::now(),
            },
        ] {
            phase.force_stop();
            assert!(phase.is_stopped());
        }
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionPhase::Idle.to_string(), "Idle");
        assert_eq!(SessionPhase::Connecting.to_string(), "Connecting");
        assert_eq!(
            SessionPhase::Active {
                since: Instant::now()
            }
            .to_string(),
            "Active"
        );
        assert_eq!(SessionPhase::Stopped.to_string(), "Stopped");
    }
}

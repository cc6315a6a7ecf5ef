//! TCP plumbing for sessions.
//!
//! The sessions themselves are transport-agnostic; this module supplies
//! the concrete [`TcpConnection`] handle and the readiness pump that
//! feeds stream events into a session from one execution context.

mod connection;
mod driver;

pub use connection::{ConnectionInfo, TcpConnection};
pub use driver::{interest_for, pump};

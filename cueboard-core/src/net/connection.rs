//! Connection handle and addressing.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{Interest, Ready};
use tokio::net::TcpStream;

use crate::session::StreamConnection;

// ── ConnectionInfo ───────────────────────────────────────────────

/// Host/port pair identifying a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    ip: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn to_socket_string(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

// ── TcpConnection ────────────────────────────────────────────────

/// Cloneable handle over a non-blocking TCP stream.
///
/// One clone lives inside the session as its
/// [`StreamConnection`]; another stays with the readiness loop that
/// reads the socket. The open flag is flipped by whichever side
/// observes close or error, so a session's `is_connected` view and the
/// loop agree. The handle never shuts the socket down: dropping the
/// last clone releases it.
#[derive(Debug, Clone)]
pub struct TcpConnection {
    stream: Arc<TcpStream>,
    open: Arc<AtomicBool>,
}

impl TcpConnection {
    /// Wrap an already-established stream (the accept side).
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream: Arc::new(stream),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Dial a peer (the connect side).
    pub async fn connect(info: &ConnectionInfo) -> io::Result<Self> {
        let stream = TcpStream::connect(info.to_socket_string()).await?;
        Ok(Self::from_stream(stream))
    }

    /// Wait until the socket is ready for any of `interest`.
    pub async fn ready(&self, interest: Interest) -> io::Result<Ready> {
        self.stream.ready(interest).await
    }

    /// Non-blocking read. `Ok(0)` means the peer closed.
    pub fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.try_read(buf)
    }

    /// Record that the link is gone.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl StreamConnection for TcpConnection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.try_write(buf)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_info_display() {
        let info = ConnectionInfo::new("127.0.0.1", 4321);
        assert_eq!(info.to_socket_string(), "127.0.0.1:4321");
        assert_eq!(info.to_string(), "127.0.0.1:4321");
        assert_eq!(info.ip(), "127.0.0.1");
        assert_eq!(info.port(), 4321);
    }

    #[tokio::test]
    async fn clones_share_the_open_flag() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, _server) = tokio::join!(
            TcpStream::connect(addr),
            async { listener.accept().await.unwrap().0 }
        );

        let a = TcpConnection::from_stream(client.unwrap());
        let b = a.clone();
        assert!(a.is_open() && b.is_open());

        a.mark_closed();
        assert!(!b.is_open());
    }
}

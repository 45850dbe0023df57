//! Transports move bytes for a [`crate::NetVConnection`].
//!
//! A transport knows nothing about operation handles, sinks or timeouts. The
//! driver task asks it to read, write, half-close and close, and reports the
//! outcome back to the connection core.

use crate::event::{CloseReason, ShutdownHowTo};
use async_trait::async_trait;
use std::net::SocketAddr;

pub mod socket_helpers;
pub mod tcp;
pub mod tunnel;
pub mod udp;

pub use tcp::TcpTransport;
pub use tunnel::TunnelTransport;
pub use udp::UdpTransport;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Tcp,
    Udp,
    /// A stream carried inside another protocol, e.g. an encrypted tunnel
    Tunnel,
}

#[cfg(unix)]
pub type RawSocketHandle = std::os::unix::io::RawFd;
#[cfg(windows)]
pub type RawSocketHandle = std::os::windows::io::RawSocket;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn kind(&self) -> TransportKind;
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
    fn peer_addr(&self) -> std::io::Result<SocketAddr>;

    /// The OS handle, for transports that own one
    fn raw_socket(&self) -> Option<RawSocketHandle> {
        None
    }

    /// Whether a zero-length read means the peer closed the stream
    fn reports_eos(&self) -> bool {
        true
    }

    /// Reads into `buf`. `Ok(0)` is end-of-stream when [`Transport::reports_eos`] holds.
    /// Must be cancel safe
    async fn read(&self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Writes a prefix of `buf`, returning its length. Must be cancel safe
    async fn write(&self, buf: &[u8]) -> std::io::Result<usize>;

    /// Pushes out anything the transport buffered internally. Not raced against
    /// other operations, so it need not be cancel safe
    async fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Sends urgent data outside the ordinary byte stream
    async fn send_oob(&self, _data: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "out-of-band data is not supported by this transport",
        ))
    }

    async fn shutdown(&self, how: ShutdownHowTo) -> std::io::Result<()>;

    /// Final teardown. Called once by the driver after the connection closed
    fn close(&self, _reason: CloseReason) {}
}

/// Errors that mean the peer has gone away rather than that the transport failed
pub fn is_peer_closed(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::UnexpectedEof
    )
}

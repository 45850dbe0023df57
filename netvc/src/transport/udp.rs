use super::{RawSocketHandle, Transport, TransportKind};
use crate::event::ShutdownHowTo;
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use netvc_io::Mutex;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Largest payload a single datagram can carry
pub const MAX_DATAGRAM: usize = 65_535;

/// A connected datagram socket. A datagram never signals end-of-stream.
///
/// Datagrams are always received whole. When the reader asks for fewer bytes
/// than a datagram holds, the rest is kept and handed out by the next reads
/// before the socket is polled again.
pub struct UdpTransport {
    socket: UdpSocket,
    leftover: Mutex<Bytes>,
}

impl UdpTransport {
    /// `socket` must already be connected to its peer
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            leftover: Mutex::new(Bytes::new()),
        }
    }

    fn take_leftover(&self, buf: &mut [u8]) -> usize {
        let mut leftover = self.leftover.lock();
        let n = leftover.len().min(buf.len());
        buf[..n].copy_from_slice(&leftover[..n]);
        leftover.advance(n);
        n
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.peer_addr()
    }

    fn raw_socket(&self) -> Option<RawSocketHandle> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            Some(self.socket.as_raw_fd())
        }

        #[cfg(windows)]
        {
            use std::os::windows::io::AsRawSocket;
            Some(self.socket.as_raw_socket())
        }
    }

    fn reports_eos(&self) -> bool {
        false
    }

    async fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let n = self.take_leftover(buf);
        if n > 0 {
            return Ok(n);
        }

        let mut datagram = BytesMut::zeroed(MAX_DATAGRAM);
        let len = self.socket.recv(&mut datagram).await?;
        datagram.truncate(len);

        let n = len.min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        if n < len {
            log::trace!(target: "netvc", "Holding {} bytes of a {len} byte datagram for the next read", len - n);
            *self.leftover.lock() = datagram.freeze().slice(n..);
        }

        Ok(n)
    }

    async fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
        self.socket.send(buf).await
    }

    async fn shutdown(&self, how: ShutdownHowTo) -> std::io::Result<()> {
        log::trace!(target: "netvc", "UDP shutdown({how:?}) has no wire effect");
        Ok(())
    }
}

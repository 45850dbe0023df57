use super::{RawSocketHandle, Transport, TransportKind};
use crate::event::{CloseReason, ShutdownHowTo};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::Interest;
use tokio::net::TcpStream;

pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

impl From<TcpStream> for TcpTransport {
    fn from(stream: TcpStream) -> Self {
        Self::new(stream)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    fn raw_socket(&self) -> Option<RawSocketHandle> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            Some(self.stream.as_raw_fd())
        }

        #[cfg(windows)]
        {
            use std::os::windows::io::AsRawSocket;
            Some(self.stream.as_raw_socket())
        }
    }

    async fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            self.stream.readable().await?;

            match self.stream.try_read(buf) {
                Ok(n) => return Ok(n),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    continue;
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }
    }

    async fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
        loop {
            self.stream.writable().await?;

            match self.stream.try_write(buf) {
                Ok(n) => return Ok(n),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    continue;
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }
    }

    async fn send_oob(&self, data: &[u8]) -> std::io::Result<()> {
        let mut sent = 0;
        while sent < data.len() {
            let n = self
                .stream
                .async_io(Interest::WRITABLE, || {
                    socket2::SockRef::from(&self.stream).send_out_of_band(&data[sent..])
                })
                .await?;

            if n == 0 {
                return Err(ErrorKind::WriteZero.into());
            }

            sent += n;
        }

        Ok(())
    }

    async fn shutdown(&self, how: ShutdownHowTo) -> std::io::Result<()> {
        match socket2::SockRef::from(&self.stream).shutdown(how.to_std()) {
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            res => res,
        }
    }

    fn close(&self, reason: CloseReason) {
        if reason.is_abort() {
            log::trace!(target: "netvc", "Resetting TCP connection ({reason:?})");
            // a zero linger makes the kernel send RST when the socket is dropped
            if let Err(err) = socket2::SockRef::from(&self.stream).set_linger(Some(Duration::ZERO))
            {
                log::warn!(target: "netvc", "Unable to set linger for abort: {err:?}");
            }
        }
    }
}

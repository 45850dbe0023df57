use super::{Transport, TransportKind};
use crate::event::ShutdownHowTo;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

/// Wraps any bidirectional stream, e.g. an encrypted tunnel. The stream does
/// not know its endpoints, so they are supplied at construction
pub struct TunnelTransport<S> {
    reader: Mutex<ReadHalf<S>>,
    writer: Mutex<WriteHalf<S>>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl<S: AsyncRead + AsyncWrite + Send + 'static> TunnelTransport<S> {
    pub fn new(stream: S, local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            local_addr,
            peer_addr,
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Send + 'static> Transport for TunnelTransport<S> {
    fn kind(&self) -> TransportKind {
        TransportKind::Tunnel
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Ok(self.local_addr)
    }

    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        Ok(self.peer_addr)
    }

    async fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.lock().await.read(buf).await
    }

    async fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.lock().await.write(buf).await
    }

    async fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().await.flush().await
    }

    async fn shutdown(&self, how: ShutdownHowTo) -> std::io::Result<()> {
        // the read half of a tunnel cannot be closed independently, the driver
        // simply stops reading from it
        if how.includes_write() {
            self.writer.lock().await.shutdown().await?;
        }

        Ok(())
    }
}

//! Connection establishment.
//!
//! A [`NetProcessor`] is bound to an explicit tokio runtime handle. Every
//! connection it creates or adopts gets a transport pump spawned on that
//! runtime and is returned as an `Arc<dyn VConnection>`.

use crate::driver;
use crate::error::VcError;
use crate::net_vconnection::NetVConnection;
use crate::options::{IpProtocol, NetVcOptions};
use crate::timeout::{SystemClock, TimeoutClock};
use crate::transport::socket_helpers;
use crate::transport::{TcpTransport, Transport, TunnelTransport, UdpTransport};
use crate::vconnection::VConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, TcpStream, UdpSocket};
use tokio::runtime::Handle;

/// Status reported to establishment callbacks when a connection was made
pub const CONNECT_SUCCESS: i32 = 1;
/// Status reported to establishment callbacks when a connection failed
pub const CONNECT_FAILURE: i32 = 0;

/// Maps an establishment result onto [`CONNECT_SUCCESS`] / [`CONNECT_FAILURE`]
pub fn connect_status<T>(result: &Result<T, VcError>) -> i32 {
    if result.is_ok() {
        CONNECT_SUCCESS
    } else {
        CONNECT_FAILURE
    }
}

#[derive(Clone)]
pub struct NetProcessor {
    handle: Handle,
    clock: Arc<dyn TimeoutClock>,
}

impl NetProcessor {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            clock: Arc::new(SystemClock),
        }
    }

    /// Binds to the runtime the caller is running on
    pub fn current() -> Result<Self, VcError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|err| VcError::Generic(err.to_string()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeoutClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Opens a connection to `remote` configured by `options`
    pub async fn connect(
        &self,
        remote: SocketAddr,
        options: &NetVcOptions,
    ) -> Result<Arc<dyn VConnection>, VcError> {
        options.validate_for(&remote)?;
        let socket = socket_helpers::get_socket(&remote, options)?;
        log::trace!(target: "netvc", "Connecting to {remote} over {:?} (blocking_connect={})", options.protocol, options.blocking_connect);

        match options.protocol {
            IpProtocol::Tcp => {
                let stream = if options.blocking_connect {
                    let socket = netvc_io::spawn_blocking(move || {
                        socket.set_nonblocking(false)?;
                        socket.connect(&remote.into())?;
                        socket.set_nonblocking(true)?;
                        Ok::<_, std::io::Error>(socket)
                    })
                    .await??;

                    let _guard = self.handle.enter();
                    TcpStream::from_std(socket.into())?
                } else {
                    // registers the stream with this processor's runtime, not the caller's
                    self.handle
                        .spawn(async move {
                            TcpSocket::from_std_stream(socket.into())
                                .connect(remote)
                                .await
                        })
                        .await
                        .map_err(|err| VcError::Generic(err.to_string()))??
                };

                log::debug!(target: "netvc", "Connected to {remote} over TCP");
                Ok(self.attach_tcp(stream, options.clone()))
            }

            IpProtocol::Udp => {
                socket.connect(&remote.into())?;
                let socket = {
                    let _guard = self.handle.enter();
                    UdpSocket::from_std(socket.into())?
                };

                log::debug!(target: "netvc", "Connected to {remote} over UDP");
                Ok(self.attach_udp(socket, options.clone()))
            }
        }
    }

    /// Accepts the next connection on `listener`
    pub async fn accept(
        &self,
        listener: &TcpListener,
        options: &NetVcOptions,
    ) -> Result<Arc<dyn VConnection>, VcError> {
        let (stream, peer) = listener.accept().await?;
        {
            let sock = socket2::SockRef::from(&stream);
            socket_helpers::apply_stream_flags(&sock, options.sockopt_flags)?;
            if let Some(size) = options.recv_buffer_hint {
                sock.set_recv_buffer_size(size)?;
            }
            if let Some(size) = options.send_buffer_hint {
                sock.set_send_buffer_size(size)?;
            }
        }

        log::debug!(target: "netvc", "Accepted connection from {peer}");
        Ok(self.attach_tcp(stream, options.clone()))
    }

    pub fn attach_tcp(&self, stream: TcpStream, options: NetVcOptions) -> Arc<dyn VConnection> {
        self.attach_transport(Arc::new(TcpTransport::new(stream)), options)
    }

    /// `socket` must already be connected to its peer
    pub fn attach_udp(&self, socket: UdpSocket, options: NetVcOptions) -> Arc<dyn VConnection> {
        let options = options.with_protocol(IpProtocol::Udp);
        self.attach_transport(Arc::new(UdpTransport::new(socket)), options)
    }

    pub fn attach_tunnel<S: AsyncRead + AsyncWrite + Send + 'static>(
        &self,
        stream: S,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        options: NetVcOptions,
    ) -> Arc<dyn VConnection> {
        let transport = TunnelTransport::new(stream, local_addr, peer_addr);
        self.attach_transport(Arc::new(transport), options)
    }

    /// Wraps any transport in a connection and starts its pump
    pub fn attach_transport(
        &self,
        transport: Arc<dyn Transport>,
        options: NetVcOptions,
    ) -> Arc<dyn VConnection> {
        let vc = NetVConnection::with_clock(transport, options, self.clock.clone());
        let _ = self.handle.spawn(driver::drive(vc.clone()));
        vc
    }
}

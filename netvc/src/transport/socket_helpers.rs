//! Socket creation and option application.
//!
//! Builds `socket2` sockets configured from [`NetVcOptions`] before they are
//! handed to tokio. Errors are reported as `anyhow::Error` and converted to
//! [`crate::error::VcError`] at the public boundary.

use crate::options::{AddrBinding, IpProtocol, NetVcOptions, PortBinding, SockOptFlags};
use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};
use std::net::SocketAddr;

fn domain_for(addr: &SocketAddr) -> Domain {
    if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    }
}

/// Creates an unconnected socket for reaching `remote`, with every option applied
/// and bound if the options ask for a local address or port
pub fn get_socket(remote: &SocketAddr, options: &NetVcOptions) -> Result<Socket, anyhow::Error> {
    let socket = match options.protocol {
        IpProtocol::Tcp => Socket::new(domain_for(remote), Type::STREAM, Some(Protocol::TCP))?,
        IpProtocol::Udp => Socket::new(domain_for(remote), Type::DGRAM, Some(Protocol::UDP))?,
    };

    apply_to_socket(&socket, options)?;

    if let Some(bind_addr) = options.bind_addr(remote) {
        log::trace!(target: "netvc", "[Socket helper] Binding {} socket to {bind_addr} ({})", remote, options.local_addr_binding);
        socket.bind(&SockAddr::from(bind_addr))?;
    }

    Ok(socket)
}

/// Applies the tuning options to an existing socket. Binding is left to the caller
pub fn apply_to_socket(socket: &Socket, options: &NetVcOptions) -> Result<(), anyhow::Error> {
    if let PortBinding::Fixed(_) = options.local_port_binding {
        socket.set_reuse_address(true)?;
    }

    if let Some(size) = options.recv_buffer_hint {
        socket.set_recv_buffer_size(size)?;
    }

    if let Some(size) = options.send_buffer_hint {
        socket.set_send_buffer_size(size)?;
    }

    if options.protocol == IpProtocol::Tcp {
        apply_stream_flags(&SockRef::from(socket), options.sockopt_flags)?;
    }

    if let AddrBinding::Foreign(addr) = options.local_addr_binding {
        set_transparent(socket, addr.is_ipv4())?;
    }

    if options.blocking_io {
        log::warn!(target: "netvc", "blocking_io is a hint only; connection I/O stays non-blocking");
    }

    socket.set_nonblocking(true)?;

    Ok(())
}

/// Applies the TCP flags to an already connected or accepted stream
pub fn apply_stream_flags(socket: &SockRef<'_>, flags: SockOptFlags) -> Result<(), anyhow::Error> {
    if flags.contains(SockOptFlags::NO_DELAY) {
        socket.set_nodelay(true)?;
    }

    if flags.contains(SockOptFlags::KEEP_ALIVE) {
        socket.set_keepalive(true)?;
    }

    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn set_transparent(socket: &Socket, ipv4: bool) -> Result<(), anyhow::Error> {
    if ipv4 {
        socket.set_ip_transparent(true)?;
    } else {
        log::warn!(target: "netvc", "Transparent binding is only applied to IPv4 sockets");
    }

    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn set_transparent(_socket: &Socket, _ipv4: bool) -> Result<(), anyhow::Error> {
    log::warn!(target: "netvc", "Transparent binding is not supported on this platform");
    Ok(())
}

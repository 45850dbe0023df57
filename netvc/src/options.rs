//! Connection options.
//!
//! [`NetVcOptions`] is a plain value copied into a connection when it is
//! established and never mutated afterwards. It is applied to the OS socket by
//! [`crate::transport::socket_helpers::apply_to_socket`].

use crate::error::VcError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ops::BitOr;

pub const SOCKS_DEFAULT_VERSION: u8 = 4;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpProtocol {
    #[default]
    Tcp,
    Udp,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortBinding {
    /// Let the system pick an ephemeral port
    #[default]
    Any,
    Fixed(u16),
}

impl PortBinding {
    pub fn port(&self) -> u16 {
        match self {
            PortBinding::Any => 0,
            PortBinding::Fixed(port) => *port,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddrBinding {
    #[default]
    Any,
    /// Bind to an address of a local interface
    Interface(IpAddr),
    /// Bind to an address that is not local. Engages transparent proxying
    Foreign(IpAddr),
}

impl AddrBinding {
    /// The address to bind to, `None` for `Any`
    pub fn addr(&self) -> Option<IpAddr> {
        match self {
            AddrBinding::Any => None,
            AddrBinding::Interface(addr) | AddrBinding::Foreign(addr) => Some(*addr),
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, AddrBinding::Foreign(_))
    }
}

impl Display for AddrBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddrBinding::Any => write!(f, "any"),
            AddrBinding::Interface(_) => write!(f, "interface"),
            AddrBinding::Foreign(_) => write!(f, "foreign"),
        }
    }
}

/// Power-of-two socket tuning flags
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SockOptFlags(u32);

impl SockOptFlags {
    pub const NONE: SockOptFlags = SockOptFlags(0);
    pub const NO_DELAY: SockOptFlags = SockOptFlags(1);
    pub const KEEP_ALIVE: SockOptFlags = SockOptFlags(2);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: SockOptFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: SockOptFlags) {
        self.0 |= other.0
    }
}

impl BitOr for SockOptFlags {
    type Output = SockOptFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        SockOptFlags(self.0 | rhs.0)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocksSupport {
    Disabled,
    #[default]
    Enabled,
}

/// Which class of event threads a connection prefers to be scheduled on
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventAffinity {
    #[default]
    Net,
    Tag(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetVcOptions {
    pub protocol: IpProtocol,
    pub local_port_binding: PortBinding,
    pub local_addr_binding: AddrBinding,
    /// Hint only. Steady-state I/O is always non-blocking
    pub blocking_io: bool,
    /// Run the connect itself on a blocking thread
    pub blocking_connect: bool,
    pub socks_support: SocksSupport,
    pub socks_version: u8,
    pub recv_buffer_hint: Option<usize>,
    pub send_buffer_hint: Option<usize>,
    pub sockopt_flags: SockOptFlags,
    pub affinity: EventAffinity,
}

impl NetVcOptions {
    pub fn new() -> Self {
        Self {
            protocol: IpProtocol::Tcp,
            local_port_binding: PortBinding::Any,
            local_addr_binding: AddrBinding::Any,
            blocking_io: false,
            blocking_connect: false,
            socks_support: SocksSupport::Enabled,
            socks_version: SOCKS_DEFAULT_VERSION,
            recv_buffer_hint: None,
            send_buffer_hint: None,
            sockopt_flags: SockOptFlags::NONE,
            affinity: EventAffinity::Net,
        }
    }

    /// Restores every field to its default
    pub fn reset(&mut self) {
        *self = Self::new()
    }

    pub fn set_sock_param(
        &mut self,
        recv_buffer_hint: Option<usize>,
        send_buffer_hint: Option<usize>,
        flags: SockOptFlags,
    ) {
        self.recv_buffer_hint = recv_buffer_hint;
        self.send_buffer_hint = send_buffer_hint;
        self.sockopt_flags = flags;
    }

    pub fn with_protocol(mut self, protocol: IpProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_local_port(mut self, binding: PortBinding) -> Self {
        self.local_port_binding = binding;
        self
    }

    pub fn with_local_addr(mut self, binding: AddrBinding) -> Self {
        self.local_addr_binding = binding;
        self
    }

    pub fn with_blocking_connect(mut self, blocking: bool) -> Self {
        self.blocking_connect = blocking;
        self
    }

    pub fn with_sockopt_flags(mut self, flags: SockOptFlags) -> Self {
        self.sockopt_flags = flags;
        self
    }

    pub fn with_buffer_hints(mut self, recv: Option<usize>, send: Option<usize>) -> Self {
        self.recv_buffer_hint = recv;
        self.send_buffer_hint = send;
        self
    }

    /// Checks that these options can be used to reach `remote`
    pub fn validate_for(&self, remote: &SocketAddr) -> Result<(), VcError> {
        match self.local_addr_binding.addr() {
            Some(local) if local.is_ipv4() != remote.is_ipv4() => Err(VcError::InvalidOptions(
                "local address family does not match the remote address",
            )),
            _ => Ok(()),
        }
    }

    /// The local address to bind before connecting to `remote`. `None` when
    /// both the address and the port are left to the system
    pub fn bind_addr(&self, remote: &SocketAddr) -> Option<SocketAddr> {
        let ip = self.local_addr_binding.addr();
        if ip.is_none() && self.local_port_binding == PortBinding::Any {
            return None;
        }

        let ip = ip.unwrap_or(match remote {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        });

        Some(SocketAddr::new(ip, self.local_port_binding.port()))
    }
}

impl Default for NetVcOptions {
    fn default() -> Self {
        Self::new()
    }
}

//! The virtual connection interface.
//!
//! State machines talk to every connection through [`VConnection`], whatever
//! transport carries it. All operations return immediately after recording
//! intent; results arrive later as events on the sink named by the operation.

use crate::buffer::{BufferReader, IoBuffer};
use crate::continuation::Sink;
use crate::error::VcError;
use crate::event::{CloseReason, IoLen, ShutdownHowTo};
use crate::lifecycle::Lifecycle;
use crate::net_vconnection::OobAction;
use crate::options::NetVcOptions;
use crate::transport::{RawSocketHandle, TransportKind};
use crate::vio::Vio;
use bytes::Bytes;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub trait VConnection: Send + Sync + 'static {
    /// Begins, or with the same sink replaces, the read operation. Read events
    /// go to `sink` until the operation retires
    fn do_io_read(&self, sink: Sink, nbytes: IoLen, buffer: IoBuffer) -> Result<Vio, VcError>;

    /// Begins, or with the same sink replaces, the write operation. With
    /// `take_ownership` the connection releases `reader` once it is done with it
    fn do_io_write(
        &self,
        sink: Sink,
        nbytes: IoLen,
        reader: BufferReader,
        take_ownership: bool,
    ) -> Result<Vio, VcError>;

    /// Resumes `vio` after a progress event. Safe from any thread
    fn reenable(&self, vio: &Vio) -> Result<(), VcError>;

    /// Resumes `vio` from inside a callback delivered by this connection
    fn reenable_re(&self, vio: &Vio) -> Result<(), VcError>;

    /// Terminal teardown. A second call is a no-op
    fn do_io_close(&self, reason: CloseReason);

    /// Permanently stops I/O and events in the given direction(s)
    fn do_io_shutdown(&self, how: ShutdownHowTo) -> Result<(), VcError>;

    /// Queues an out-of-band send. Its outcome is reported once to `sink`
    fn send_oob(&self, sink: Sink, data: Bytes) -> Result<OobAction, VcError>;

    /// Discards the outstanding out-of-band send. No callback for it follows
    fn cancel_oob(&self);

    fn set_active_timeout(&self, timeout: Duration);
    fn set_inactivity_timeout(&self, timeout: Duration);
    fn cancel_active_timeout(&self);
    fn cancel_inactivity_timeout(&self);
    fn get_active_timeout(&self) -> Option<Duration>;
    fn get_inactivity_timeout(&self) -> Option<Duration>;

    fn lifecycle(&self) -> Lifecycle;

    fn is_closed(&self) -> bool {
        self.lifecycle().is_closed()
    }

    fn options(&self) -> &NetVcOptions;
    fn transport_kind(&self) -> TransportKind;
    fn raw_socket(&self) -> Option<RawSocketHandle>;

    /// Resolved on first use, then cached
    fn local_addr(&self) -> Option<SocketAddr>;
    /// Resolved on first use, then cached
    fn remote_addr(&self) -> Option<SocketAddr>;

    fn local_ip(&self) -> Option<IpAddr> {
        self.local_addr().map(|addr| addr.ip())
    }

    fn local_port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_addr().map(|addr| addr.ip())
    }

    fn remote_port(&self) -> Option<u16> {
        self.remote_addr().map(|addr| addr.port())
    }

    /// Marks traffic that upper layers treat as privileged
    fn is_internal_request(&self) -> bool;
    fn set_is_internal_request(&self, internal: bool);

    /// Opaque classification bits owned by upper layers
    fn attributes(&self) -> u32;
    fn set_attributes(&self, attributes: u32);

    /// Composes a detailed log into this connection. Until then every other
    /// logging call is a no-op
    fn logging_init(&self);
    fn logging_enabled(&self) -> bool;
    /// Records `message` and prints the whole log
    fn add_log_message(&self, message: &str);
    fn print_logs(&self);
    fn clear_logs(&self);
    fn logs_total_time(&self) -> Duration;
}

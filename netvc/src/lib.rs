//! # netvc
//!
//! Transport-agnostic asynchronous virtual connections.
//!
//! A state machine issues reads and writes against a [`VConnection`] and gets
//! back an operation handle ([`vio::Vio`]). Progress, completion, end-of-stream,
//! errors and timeouts are then delivered as [`VcEvent`]s to the
//! [`continuation::Continuation`] named when the operation was issued. The
//! connection never calls a sink re-entrantly, never delivers an event for a
//! direction that was shut down, and never delivers anything after close.
//!
//! ## Example
//!
//! ```rust,no_run
//! use netvc::prelude::*;
//!
//! async fn fetch(remote: std::net::SocketAddr) -> Result<(), VcError> {
//!     let processor = NetProcessor::current()?;
//!     let vc = processor.connect(remote, &NetVcOptions::default()).await?;
//!     let buffer = IoBuffer::new();
//!     let sink = Sink::new(|event: VcEvent, vio: &Vio| {
//!         println!("{event:?} after {} bytes", vio.ndone());
//!         EventResult::Continue
//!     });
//!
//!     vc.set_inactivity_timeout(std::time::Duration::from_secs(30));
//!     vc.do_io_read(sink, IoLen::Bytes(100), buffer)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! - [`net_vconnection`]: the connection core and its serialized event delivery
//! - [`transport`]: TCP, UDP and tunnel transports
//! - [`driver`]: the task moving bytes between a transport and the core
//! - [`processor`]: connection establishment bound to an explicit runtime
#![forbid(unsafe_code)]

pub mod addr;
pub mod buffer;
pub mod continuation;
pub mod detailed_log;
pub mod driver;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod net_vconnection;
pub mod options;
pub mod processor;
pub mod timeout;
pub mod transport;
pub mod vconnection;
pub mod vio;

pub use event::VcEvent;
pub use net_vconnection::NetVConnection;
pub use vconnection::VConnection;

pub mod prelude {
    pub use crate::buffer::{BufferReader, IoBuffer};
    pub use crate::continuation::{Continuation, Sink};
    pub use crate::error::VcError;
    pub use crate::event::{
        CloseReason, EventResult, IoLen, ShutdownHowTo, VcEvent, CLOSE_NORMAL,
    };
    pub use crate::lifecycle::Lifecycle;
    pub use crate::net_vconnection::{NetVConnection, OobAction};
    pub use crate::options::{
        AddrBinding, EventAffinity, IpProtocol, NetVcOptions, PortBinding, SockOptFlags,
        SocksSupport,
    };
    pub use crate::processor::{NetProcessor, CONNECT_FAILURE, CONNECT_SUCCESS};
    pub use crate::timeout::{ManualClock, SystemClock, TimeoutClock};
    pub use crate::transport::{Transport, TransportKind};
    pub use crate::vconnection::VConnection;
    pub use crate::vio::{Vio, VioOp};
}

//! The event vocabulary exchanged between a virtual connection and its sinks,
//! plus the small value types that parameterise I/O and teardown.

use serde::{Deserialize, Serialize};

/// Status passed to [`crate::VConnection::do_io_close`] for an ordinary close
pub const CLOSE_NORMAL: i32 = -1;

/// Error code reported when the platform gives no OS error number
pub const UNKNOWN_ERRNO: i32 = -1;

/// An event delivered to a [`crate::continuation::Continuation`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VcEvent {
    /// Data was added to the read buffer
    ReadReady,
    /// The requested number of bytes has been read
    ReadComplete,
    /// The peer shut the stream down
    Eos,
    /// A transport error, carrying an errno-style status
    Error(i32),
    /// Data was drained from the write reader, or the reader ran dry
    WriteReady,
    /// The requested number of bytes has been written
    WriteComplete,
    ActiveTimeout,
    InactivityTimeout,
    /// An out-of-band send finished
    OobComplete,
}

impl VcEvent {
    /// Terminal events retire the operation handle they are delivered with
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VcEvent::ReadComplete | VcEvent::WriteComplete | VcEvent::Eos | VcEvent::Error(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VcEvent::ActiveTimeout | VcEvent::InactivityTimeout)
    }

    /// Builds an [`VcEvent::Error`] from an I/O error
    pub fn from_io_error(err: &std::io::Error) -> Self {
        VcEvent::Error(err.raw_os_error().unwrap_or(UNKNOWN_ERRNO))
    }
}

/// What a handler reports back after processing an event.
///
/// Only timeout delivery looks at the result: `Done` stops the notification
/// from propagating to the write-side sink.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EventResult {
    Done,
    #[default]
    Continue,
}

/// Which side(s) of a connection [`crate::VConnection::do_io_shutdown`] terminates
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShutdownHowTo {
    ReadOnly,
    WriteOnly,
    Both,
}

impl ShutdownHowTo {
    pub fn includes_read(&self) -> bool {
        matches!(self, ShutdownHowTo::ReadOnly | ShutdownHowTo::Both)
    }

    pub fn includes_write(&self) -> bool {
        matches!(self, ShutdownHowTo::WriteOnly | ShutdownHowTo::Both)
    }

    /// Combines two requests, e.g. a read shutdown followed by a write shutdown
    pub fn merge(self, other: ShutdownHowTo) -> ShutdownHowTo {
        if self == other {
            self
        } else {
            ShutdownHowTo::Both
        }
    }

    pub fn to_std(self) -> std::net::Shutdown {
        match self {
            ShutdownHowTo::ReadOnly => std::net::Shutdown::Read,
            ShutdownHowTo::WriteOnly => std::net::Shutdown::Write,
            ShutdownHowTo::Both => std::net::Shutdown::Both,
        }
    }
}

/// Why a connection is being closed.
///
/// The wire effect is transport specific. For TCP an abort resets the
/// connection instead of performing an orderly FIN.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CloseReason {
    #[default]
    Normal,
    /// Abort with an errno-style status (`>= 0`)
    Abort(i32),
    /// Any other negative status
    Abnormal(i32),
}

impl CloseReason {
    /// An abort without a specific status
    pub fn abort() -> Self {
        CloseReason::Abort(0)
    }

    /// `-1` is a normal close, non-negative values abort, other negatives are abnormal
    pub fn from_status(status: i32) -> Self {
        match status {
            CLOSE_NORMAL => CloseReason::Normal,
            code if code >= 0 => CloseReason::Abort(code),
            code => CloseReason::Abnormal(code),
        }
    }

    pub fn status(&self) -> i32 {
        match self {
            CloseReason::Normal => CLOSE_NORMAL,
            CloseReason::Abort(code) | CloseReason::Abnormal(code) => *code,
        }
    }

    pub fn is_abort(&self) -> bool {
        !matches!(self, CloseReason::Normal)
    }
}

impl From<i32> for CloseReason {
    fn from(status: i32) -> Self {
        Self::from_status(status)
    }
}

/// Requested length of a read or write operation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoLen {
    Bytes(u64),
    /// Continue until end-of-stream or error
    Unbounded,
}

impl IoLen {
    /// Bytes left after `ndone` have been transferred. `None` when unbounded
    pub fn remaining(&self, ndone: u64) -> Option<u64> {
        match self {
            IoLen::Bytes(n) => Some(n.saturating_sub(ndone)),
            IoLen::Unbounded => None,
        }
    }

    pub fn is_satisfied_by(&self, ndone: u64) -> bool {
        matches!(self, IoLen::Bytes(n) if ndone >= *n)
    }
}

impl From<u64> for IoLen {
    fn from(n: u64) -> Self {
        IoLen::Bytes(n)
    }
}

impl From<usize> for IoLen {
    fn from(n: usize) -> Self {
        IoLen::Bytes(n as u64)
    }
}

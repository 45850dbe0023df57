use crate::vio::VioOp;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// The error type for caller-facing virtual connection operations.
///
/// Transport failures are never returned through this type once a connection
/// is established; they reach the state machine as [`crate::event::VcEvent::Error`].
pub enum VcError {
    /// The connection has been closed. No operation may be issued on it
    Closed,
    /// The given direction was shut down
    Shutdown(VioOp),
    /// A different sink already owns an operation on this direction
    OperationInProgress(VioOp),
    /// There is no operation outstanding on this direction
    NoOperation(VioOp),
    /// The handle has completed, been replaced, or belongs to another connection
    StaleHandle,
    /// An out-of-band send is already outstanding
    OobInProgress,
    /// `reenable_re` was called outside of a callback delivered by this connection
    NotInCallback,
    /// The supplied options cannot be honoured
    InvalidOptions(&'static str),
    /// Thrown when the underlying socket fails during establishment
    SocketError(String),
    /// For a converted error
    Generic(String),
}

impl Error for VcError {}

impl Debug for VcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_msg())
    }
}

impl VcError {
    fn to_msg(&self) -> String {
        match self {
            VcError::Closed => "Connection already closed".to_string(),
            VcError::Shutdown(op) => format!("{op:?} side has been shut down"),
            VcError::OperationInProgress(op) => {
                format!("A {op:?} operation owned by another sink is outstanding")
            }
            VcError::NoOperation(op) => format!("No {op:?} operation is outstanding"),
            VcError::StaleHandle => "Operation handle is no longer active".to_string(),
            VcError::OobInProgress => "An out-of-band send is already in progress".to_string(),
            VcError::NotInCallback => {
                "reenable_re may only be called from inside a callback of this connection"
                    .to_string()
            }
            VcError::InvalidOptions(err) => (*err).to_string(),
            VcError::SocketError(err) => err.to_string(),
            VcError::Generic(err) => err.to_string(),
        }
    }

    pub fn into_string(self) -> String {
        match self {
            VcError::SocketError(err) | VcError::Generic(err) => err,
            other => other.to_msg(),
        }
    }

    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Generic(msg.into())
    }
}

impl Display for VcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <Self as Debug>::fmt(self, f)
    }
}

impl From<std::io::Error> for VcError {
    fn from(err: std::io::Error) -> Self {
        VcError::SocketError(err.to_string())
    }
}

impl From<anyhow::Error> for VcError {
    fn from(err: anyhow::Error) -> Self {
        VcError::Generic(err.to_string())
    }
}

impl From<netvc_io::shared::spawn::BlockingSpawnError> for VcError {
    fn from(err: netvc_io::shared::spawn::BlockingSpawnError) -> Self {
        VcError::Generic(err.to_string())
    }
}

//! Operation handles.
//!
//! A [`Vio`] describes one in-flight read or write: how many bytes were asked
//! for, how many have moved so far, the buffer they move through and the sink
//! that is told about progress. Handles are reference counted so that a
//! retired handle stays valid as an identity; comparing two handles compares
//! identity, never contents.

use crate::buffer::{BufferReader, IoBuffer};
use crate::continuation::Sink;
use crate::error::VcError;
use crate::event::IoLen;
use crate::vconnection::VConnection;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VioOp {
    Read,
    Write,
}

/// The data path of an operation
#[derive(Clone, Debug)]
pub enum VioBuffer {
    /// Bytes read from the transport are appended here
    Read(IoBuffer),
    /// Bytes written to the transport are drained from here
    Write(BufferReader),
}

pub(crate) struct VioInner {
    id: u64,
    op: VioOp,
    nbytes: IoLen,
    ndone: AtomicU64,
    sink: Sink,
    buffer: VioBuffer,
    owns_reader: bool,
    vc: Weak<dyn VConnection>,
}

#[derive(Clone)]
pub struct Vio {
    inner: Arc<VioInner>,
}

impl Vio {
    pub(crate) fn new(
        id: u64,
        nbytes: IoLen,
        sink: Sink,
        buffer: VioBuffer,
        owns_reader: bool,
        vc: Weak<dyn VConnection>,
    ) -> Self {
        let op = match &buffer {
            VioBuffer::Read(_) => VioOp::Read,
            VioBuffer::Write(_) => VioOp::Write,
        };

        Self {
            inner: Arc::new(VioInner {
                id,
                op,
                nbytes,
                ndone: AtomicU64::new(0),
                sink,
                buffer,
                owns_reader,
                vc,
            }),
        }
    }

    /// Unique per connection, increasing with every issued operation
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn op(&self) -> VioOp {
        self.inner.op
    }

    pub fn nbytes(&self) -> IoLen {
        self.inner.nbytes
    }

    /// Bytes transferred so far. Never decreases
    pub fn ndone(&self) -> u64 {
        self.inner.ndone.load(Ordering::Acquire)
    }

    /// Bytes still to transfer, `None` when unbounded
    pub fn ntodo(&self) -> Option<u64> {
        self.inner.nbytes.remaining(self.ndone())
    }

    pub fn is_complete(&self) -> bool {
        self.inner.nbytes.is_satisfied_by(self.ndone())
    }

    pub fn sink(&self) -> &Sink {
        &self.inner.sink
    }

    pub fn buffer(&self) -> &VioBuffer {
        &self.inner.buffer
    }

    /// The read buffer, if this is a read operation
    pub fn read_buffer(&self) -> Option<&IoBuffer> {
        match &self.inner.buffer {
            VioBuffer::Read(buf) => Some(buf),
            VioBuffer::Write(_) => None,
        }
    }

    /// The reader, if this is a write operation
    pub fn reader(&self) -> Option<&BufferReader> {
        match &self.inner.buffer {
            VioBuffer::Write(reader) => Some(reader),
            VioBuffer::Read(_) => None,
        }
    }

    /// The connection this operation was issued on, if it still exists
    pub fn vc(&self) -> Option<Arc<dyn VConnection>> {
        self.inner.vc.upgrade()
    }

    /// Resumes the operation after a progress event. Safe from any thread
    pub fn reenable(&self) -> Result<(), VcError> {
        self.vc().ok_or(VcError::Closed)?.reenable(self)
    }

    /// Resumes the operation from inside a callback of the owning connection
    pub fn reenable_re(&self) -> Result<(), VcError> {
        self.vc().ok_or(VcError::Closed)?.reenable_re(self)
    }

    pub(crate) fn owns_reader(&self) -> bool {
        self.inner.owns_reader
    }

    pub(crate) fn add_done(&self, n: u64) -> u64 {
        self.inner.ndone.fetch_add(n, Ordering::AcqRel) + n
    }

    pub(crate) fn release_reader(&self) {
        if let (true, VioBuffer::Write(reader)) = (self.inner.owns_reader, &self.inner.buffer) {
            reader.release()
        }
    }
}

impl PartialEq for Vio {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Vio {}

impl Debug for Vio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vio")
            .field("id", &self.inner.id)
            .field("op", &self.inner.op)
            .field("nbytes", &self.inner.nbytes)
            .field("ndone", &self.ndone())
            .finish()
    }
}

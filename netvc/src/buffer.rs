//! Minimal shared byte buffers for operation handles.
//!
//! A read handle appends into an [`IoBuffer`] that the issuing state machine
//! drains concurrently; a write handle drains a [`BufferReader`] that the state
//! machine fills. The water mark bounds how much a read may buffer before the
//! transport stalls waiting for a re-enable.

use bytes::{Bytes, BytesMut};
use netvc_io::Mutex;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Default number of bytes a read buffer accepts before stalling the transport
pub const DEFAULT_WATER_MARK: usize = 32 * 1024;

#[derive(Clone)]
pub struct IoBuffer {
    inner: Arc<Mutex<BytesMut>>,
    water_mark: usize,
}

impl IoBuffer {
    pub fn new() -> Self {
        Self::with_water_mark(DEFAULT_WATER_MARK)
    }

    pub fn with_water_mark(water_mark: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BytesMut::new())),
            water_mark,
        }
    }

    /// Whether both handles refer to the same underlying storage
    pub fn same_buffer(&self, other: &IoBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn water_mark(&self) -> usize {
        self.water_mark
    }

    /// Bytes currently buffered
    pub fn read_avail(&self) -> usize {
        self.inner.lock().len()
    }

    /// Room left before the water mark is reached
    pub fn write_avail(&self) -> usize {
        self.water_mark.saturating_sub(self.read_avail())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Appends `data` regardless of the water mark
    pub fn append(&self, data: &[u8]) {
        self.inner.lock().extend_from_slice(data)
    }

    /// Removes and returns up to `n` bytes from the front
    pub fn consume(&self, n: usize) -> Bytes {
        let mut inner = self.inner.lock();
        let n = n.min(inner.len());
        inner.split_to(n).freeze()
    }

    /// Removes and returns everything buffered
    pub fn take_all(&self) -> Bytes {
        self.inner.lock().split().freeze()
    }

    pub fn clear(&self) {
        self.inner.lock().clear()
    }

    /// A read cursor over this buffer, for use with a write operation
    pub fn reader(&self) -> BufferReader {
        BufferReader {
            buffer: self.clone(),
        }
    }

    fn peek(&self, max: usize) -> Bytes {
        let inner = self.inner.lock();
        let n = max.min(inner.len());
        Bytes::copy_from_slice(&inner[..n])
    }
}

impl Default for IoBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&[u8]> for IoBuffer {
    fn from(data: &[u8]) -> Self {
        let this = Self::with_water_mark(DEFAULT_WATER_MARK.max(data.len()));
        this.append(data);
        this
    }
}

impl From<Vec<u8>> for IoBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from(data.as_slice())
    }
}

impl Debug for IoBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoBuffer")
            .field("len", &self.read_avail())
            .field("water_mark", &self.water_mark)
            .finish()
    }
}

/// Read cursor handed to a write operation
#[derive(Clone, Debug)]
pub struct BufferReader {
    buffer: IoBuffer,
}

impl BufferReader {
    pub fn read_avail(&self) -> usize {
        self.buffer.read_avail()
    }

    /// Copies up to `max` bytes without consuming them
    pub fn peek(&self, max: usize) -> Bytes {
        self.buffer.peek(max)
    }

    pub fn consume(&self, n: usize) {
        let _ = self.buffer.consume(n);
    }

    /// Drops whatever remains unread. Called by the connection when it owns the reader
    pub fn release(&self) {
        self.buffer.clear()
    }

    pub fn buffer(&self) -> &IoBuffer {
        &self.buffer
    }
}

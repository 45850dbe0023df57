//! Callback sinks.
//!
//! A state machine receives events by implementing [`Continuation`] (closures
//! work too) and handing a [`Sink`] to the connection. The sink carries the
//! sink's exclusion mechanism: the connection holds the sink's mutex for the
//! whole duration of a callback, so one sink never observes two concurrent
//! invocations. Sinks are compared by identity.

use crate::event::{EventResult, VcEvent};
use crate::net_vconnection::OobAction;
use crate::vio::Vio;
use netvc_io::{Mutex, MutexGuard};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub trait Continuation: Send + 'static {
    /// Called with I/O and timeout events. `vio` is the handle the event belongs to;
    /// for timeouts it is the handle of the side being notified
    fn handle_event(&mut self, event: VcEvent, vio: &Vio) -> EventResult;

    /// Called with the outcome of an out-of-band send
    fn handle_oob_event(&mut self, event: VcEvent, action: &OobAction) -> EventResult {
        log::trace!(target: "netvc", "Unhandled out-of-band event {event:?} for {action:?}");
        EventResult::Continue
    }
}

impl<F> Continuation for F
where
    F: FnMut(VcEvent, &Vio) -> EventResult + Send + 'static,
{
    fn handle_event(&mut self, event: VcEvent, vio: &Vio) -> EventResult {
        (self)(event, vio)
    }
}

#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<dyn Continuation>>,
}

impl Sink {
    pub fn new<C: Continuation>(continuation: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(continuation)),
        }
    }

    /// Wraps a continuation the caller keeps a typed handle to. Locking that
    /// handle is locking this sink's exclusion
    pub fn from_shared<C: Continuation>(shared: Arc<Mutex<C>>) -> Self {
        Self { inner: shared }
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Sink) -> bool {
        Arc::as_ptr(&self.inner) as *const () == Arc::as_ptr(&other.inner) as *const ()
    }

    /// Acquires the sink's exclusion. No callback of any connection runs on
    /// this sink while the guard is held
    pub fn lock(&self) -> MutexGuard<'_, dyn Continuation> {
        self.inner.lock()
    }
}

impl Debug for Sink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sink({:p})", Arc::as_ptr(&self.inner) as *const ())
    }
}

//! The virtual connection core.
//!
//! [`NetVConnection`] owns the two operation slots, the timers, the lifecycle
//! and the per-connection event queue. It is driven from two directions:
//!
//! * state machines call the [`VConnection`] methods from any thread;
//! * a transport pump (see [`crate::driver`]) asks for an [`IoPlan`], moves
//!   bytes, and reports what happened through the `transport_*` methods.
//!
//! Events are queued under the state lock and drained by a single thread at a
//! time. Each delivery first takes the target sink's lock, then re-checks the
//! connection state, and only then runs the handler with no connection lock
//! held. A caller holding its sink's lock while it shuts down or closes the
//! connection therefore never sees another callback afterwards.

use crate::addr::AddrCache;
use crate::buffer::{BufferReader, IoBuffer};
use crate::continuation::Sink;
use crate::detailed_log::ConnLog;
use crate::error::VcError;
use crate::event::{CloseReason, EventResult, IoLen, ShutdownHowTo, VcEvent};
use crate::lifecycle::Lifecycle;
use crate::options::NetVcOptions;
use crate::timeout::{SystemClock, TimeoutClock, TimeoutKind, TimeoutState};
use crate::transport::{is_peer_closed, RawSocketHandle, Transport, TransportKind};
use crate::vconnection::VConnection;
use crate::vio::{Vio, VioBuffer, VioOp};
use bytes::Bytes;
use netvc_io::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Default)]
struct Side {
    active: Option<Vio>,
    /// Bumped whenever the active handle is replaced or torn down, which
    /// invalidates everything queued for it
    generation: u64,
    /// A write that ran out of data waits for a re-enable
    stalled: bool,
}

impl Side {
    fn retire(&mut self) -> Option<Vio> {
        self.generation += 1;
        self.stalled = false;
        self.active.take()
    }

    fn is_active(&self, vio: &Vio) -> bool {
        self.active.as_ref() == Some(vio)
    }
}

struct OobSend {
    sink: Sink,
    data: Bytes,
    generation: u64,
    in_flight: bool,
}

#[derive(Default)]
struct OobState {
    outstanding: Option<OobSend>,
    generation: u64,
    /// Every send with a generation at or below this value is cancelled
    cancelled_through: u64,
}

enum Pending {
    Io {
        vio: Vio,
        event: VcEvent,
        generation: u64,
    },
    Timeout {
        kind: TimeoutKind,
        generation: u64,
    },
    Oob {
        sink: Sink,
        event: VcEvent,
        generation: u64,
    },
}

#[derive(Default)]
struct VcState {
    lifecycle: Lifecycle,
    close_reason: Option<CloseReason>,
    read: Side,
    write: Side,
    timeouts: TimeoutState,
    oob: OobState,
    queue: VecDeque<Pending>,
    dispatching: Option<ThreadId>,
    inline_rearm: bool,
    next_vio_id: u64,
    pending_shutdown: Option<ShutdownHowTo>,
}

impl VcState {
    fn side(&self, op: VioOp) -> &Side {
        match op {
            VioOp::Read => &self.read,
            VioOp::Write => &self.write,
        }
    }

    fn side_mut(&mut self, op: VioOp) -> &mut Side {
        match op {
            VioOp::Read => &mut self.read,
            VioOp::Write => &mut self.write,
        }
    }

    /// The active handle of the given side, if that side is still open
    fn open_op(&self, op: VioOp) -> Option<Vio> {
        if self.lifecycle.is_open(op) {
            self.side(op).active.clone()
        } else {
            None
        }
    }

    fn has_open_io(&self) -> bool {
        self.open_op(VioOp::Read).is_some() || self.open_op(VioOp::Write).is_some()
    }

    fn cancel_oob(&mut self) -> bool {
        self.oob.cancelled_through = self.oob.generation;
        self.oob.outstanding.take().is_some()
    }
}

/// What the transport pump should do next
#[derive(Debug, Default)]
pub struct IoPlan {
    /// Set once the connection is closed. The pump tears the transport down and exits
    pub close: Option<CloseReason>,
    /// A half-close to perform on the transport
    pub shutdown: Option<ShutdownHowTo>,
    /// An out-of-band send to perform, report its outcome with [`NetVConnection::oob_finished`]
    pub oob: Option<(u64, Bytes)>,
    /// How many bytes may be read now
    pub read_window: usize,
    /// Bytes to write now. Report how many were taken with [`NetVConnection::transport_wrote`]
    pub write_chunk: Option<Bytes>,
    /// When [`NetVConnection::on_timer_tick`] should run next
    pub deadline: Option<Instant>,
}

/// Handle to an out-of-band send
#[derive(Clone, Debug)]
pub struct OobAction {
    generation: u64,
    vc: Weak<NetVConnection>,
}

impl OobAction {
    /// Cancels this send if it is still outstanding. No callback for it follows
    pub fn cancel(&self) {
        if let Some(vc) = self.vc.upgrade() {
            vc.cancel_oob_generation(self.generation)
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct NetVConnection {
    this: Weak<NetVConnection>,
    state: Mutex<VcState>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    kind: TransportKind,
    local_addr: RwLock<AddrCache>,
    remote_addr: RwLock<AddrCache>,
    clock: Arc<dyn TimeoutClock>,
    options: NetVcOptions,
    notify: Notify,
    is_internal_request: AtomicBool,
    attributes: AtomicU32,
    log: Mutex<ConnLog>,
}

/// Releases the drain slot if a handler panics mid-drain
struct DispatchGuard<'a> {
    vc: &'a NetVConnection,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.vc.state.lock();
        if state.dispatching == Some(std::thread::current().id()) {
            state.dispatching = None;
        }
    }
}

impl NetVConnection {
    pub fn new(transport: Arc<dyn Transport>, options: NetVcOptions) -> Arc<Self> {
        Self::with_clock(transport, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        transport: Arc<dyn Transport>,
        options: NetVcOptions,
        clock: Arc<dyn TimeoutClock>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            state: Mutex::new(VcState::default()),
            kind: transport.kind(),
            transport: RwLock::new(Some(transport)),
            local_addr: RwLock::new(AddrCache::Unresolved),
            remote_addr: RwLock::new(AddrCache::Unresolved),
            clock,
            options,
            notify: Notify::new(),
            is_internal_request: AtomicBool::new(false),
            attributes: AtomicU32::new(0),
            log: Mutex::new(ConnLog::default()),
        })
    }

    /// The transport, until the connection is closed
    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.read().clone()
    }

    /// Resolves once something changed that the transport pump must look at
    pub async fn notified(&self) {
        self.notify.notified().await
    }

    fn issue(
        &self,
        sink: Sink,
        nbytes: IoLen,
        buffer: VioBuffer,
        owns_reader: bool,
    ) -> Result<Vio, VcError> {
        let mut state = self.state.lock();
        let op = match &buffer {
            VioBuffer::Read(_) => VioOp::Read,
            VioBuffer::Write(_) => VioOp::Write,
        };

        if state.lifecycle.is_closed() {
            return Err(VcError::Closed);
        }

        if !state.lifecycle.is_open(op) {
            return Err(VcError::Shutdown(op));
        }

        if let Some(current) = state.side(op).active.as_ref() {
            if !current.sink().ptr_eq(&sink) {
                return Err(VcError::OperationInProgress(op));
            }

            log::trace!(target: "netvc", "Replacing {op:?} operation {}", current.id());
            if let Some(replaced) = state.side_mut(op).retire() {
                let reissued = match (replaced.reader(), &buffer) {
                    (Some(old), VioBuffer::Write(new)) => old.buffer().same_buffer(new.buffer()),
                    _ => false,
                };

                // a re-issued buffer carries on with its unread bytes
                if !reissued {
                    replaced.release_reader();
                }
            }
        }

        state.next_vio_id += 1;
        let vc: Weak<dyn VConnection> = self.this.clone();
        let vio = Vio::new(state.next_vio_id, nbytes, sink, buffer, owns_reader, vc);
        let now = self.clock.now();
        state.timeouts.touch_inactivity(now);

        let side = state.side_mut(op);
        side.stalled = false;
        // a zero-length operation is done before it starts and never produces events
        if !vio.is_complete() {
            side.active = Some(vio.clone());
        }

        drop(state);

        let name = match op {
            VioOp::Read => "do_io_read",
            VioOp::Write => "do_io_write",
        };
        self.log
            .lock()
            .add(format!("{name} id={} nbytes={nbytes:?}", vio.id()));
        self.notify.notify_one();
        Ok(vio)
    }

    fn cancel_oob_generation(&self, generation: u64) {
        let mut state = self.state.lock();
        state.oob.cancelled_through = state.oob.cancelled_through.max(generation);
        if state
            .oob
            .outstanding
            .as_ref()
            .is_some_and(|send| send.generation == generation)
        {
            state.oob.outstanding = None;
        }
    }

    fn set_timeout(&self, kind: TimeoutKind, timeout: Option<Duration>) {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            log::trace!(target: "netvc", "Ignoring {kind:?} timeout change on a closed connection");
            return;
        }

        match timeout {
            Some(timeout) => state.timeouts.set(kind, timeout, self.clock.now()),
            None => state.timeouts.cancel(kind),
        }

        drop(state);
        self.notify.notify_one();
    }

    // -- transport side --

    /// Computes the next step for the transport pump. May deliver events, so
    /// it must not be called from inside a callback
    pub fn io_plan(&self, max_chunk: usize) -> IoPlan {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            return IoPlan {
                close: Some(state.close_reason.unwrap_or_default()),
                ..Default::default()
            };
        }

        let mut plan = IoPlan {
            shutdown: state.pending_shutdown.take(),
            ..Default::default()
        };

        if let Some(send) = state.oob.outstanding.as_mut() {
            if !send.in_flight {
                send.in_flight = true;
                plan.oob = Some((send.generation, send.data.clone()));
            }
        }

        if let Some(vio) = state.open_op(VioOp::Read) {
            if let Some(buf) = vio.read_buffer() {
                let todo = vio.ntodo().map(|n| n as usize).unwrap_or(usize::MAX);
                plan.read_window = todo.min(buf.write_avail()).min(max_chunk);
            }
        }

        let mut stalled_now = None;
        if let Some(vio) = state.open_op(VioOp::Write) {
            if !state.write.stalled {
                let todo = vio.ntodo().map(|n| n as usize).unwrap_or(usize::MAX);
                let chunk = vio
                    .reader()
                    .map(|reader| reader.peek(todo.min(max_chunk)))
                    .unwrap_or_default();
                if chunk.is_empty() {
                    stalled_now = Some(vio);
                } else {
                    plan.write_chunk = Some(chunk);
                }
            }
        }

        if let Some(vio) = stalled_now {
            state.write.stalled = true;
            let generation = state.write.generation;
            state.queue.push_back(Pending::Io {
                vio,
                event: VcEvent::WriteReady,
                generation,
            });
        }

        if state.has_open_io() {
            plan.deadline = state.timeouts.next_deadline();
        }

        let queued = !state.queue.is_empty();
        drop(state);

        if queued {
            self.dispatch();
        }

        plan
    }

    /// Accepts bytes read from the transport into the active read. Returns how
    /// many were taken; anything beyond what the read asked for is refused
    pub fn transport_read(&self, data: &[u8]) -> Result<usize, VcError> {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            return Err(VcError::Closed);
        }

        if !state.lifecycle.read_open() {
            return Err(VcError::Shutdown(VioOp::Read));
        }

        let vio = state
            .read
            .active
            .clone()
            .ok_or(VcError::NoOperation(VioOp::Read))?;
        let take = vio
            .ntodo()
            .map(|n| (n as usize).min(data.len()))
            .unwrap_or(data.len());
        if take == 0 {
            return Ok(0);
        }

        if let Some(buf) = vio.read_buffer() {
            buf.append(&data[..take]);
        }

        let ndone = vio.add_done(take as u64);
        state.timeouts.touch_inactivity(self.clock.now());

        let event = if vio.nbytes().is_satisfied_by(ndone) {
            state.read.active = None;
            VcEvent::ReadComplete
        } else {
            VcEvent::ReadReady
        };

        let generation = state.read.generation;
        state.queue.push_back(Pending::Io {
            vio,
            event,
            generation,
        });
        drop(state);

        self.dispatch();
        Ok(take)
    }

    /// Records that the transport accepted `n` bytes of the last write chunk
    pub fn transport_wrote(&self, n: usize) -> Result<(), VcError> {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            return Err(VcError::Closed);
        }

        if !state.lifecycle.write_open() {
            return Err(VcError::Shutdown(VioOp::Write));
        }

        let vio = state
            .write
            .active
            .clone()
            .ok_or(VcError::NoOperation(VioOp::Write))?;
        if n == 0 {
            return Ok(());
        }

        let drained = vio.reader().map(|reader| {
            reader.consume(n);
            reader.read_avail() == 0
        });

        let ndone = vio.add_done(n as u64);
        state.timeouts.touch_inactivity(self.clock.now());

        let event = if vio.nbytes().is_satisfied_by(ndone) {
            state.write.active = None;
            vio.release_reader();
            VcEvent::WriteComplete
        } else {
            if drained.unwrap_or(true) {
                state.write.stalled = true;
            }
            VcEvent::WriteReady
        };

        let generation = state.write.generation;
        state.queue.push_back(Pending::Io {
            vio,
            event,
            generation,
        });
        drop(state);

        self.dispatch();
        Ok(())
    }

    /// The peer closed the given direction
    pub fn transport_eos(&self, op: VioOp) {
        self.terminate_side(op, VcEvent::Eos)
    }

    /// The transport failed in the given direction
    pub fn transport_error(&self, op: VioOp, code: i32) {
        self.terminate_side(op, VcEvent::Error(code))
    }

    fn terminate_side(&self, op: VioOp, event: VcEvent) {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() || !state.lifecycle.is_open(op) {
            log::trace!(target: "netvc", "Dropping {event:?} for {op:?}: direction no longer open");
            return;
        }

        let side = state.side_mut(op);
        side.stalled = false;
        let Some(vio) = side.active.take() else {
            log::trace!(target: "netvc", "Dropping {event:?} for {op:?}: no active operation");
            return;
        };

        vio.release_reader();
        if let VcEvent::Error(code) = event {
            log::error!(target: "netvc", "Transport {op:?} error on operation {} (status {code})", vio.id());
        }

        let generation = state.side(op).generation;
        state.queue.push_back(Pending::Io {
            vio,
            event,
            generation,
        });
        drop(state);

        self.dispatch();
    }

    /// Reports the outcome of the out-of-band send with the given generation
    pub fn oob_finished(&self, generation: u64, result: std::io::Result<()>) {
        let mut state = self.state.lock();
        let matches = state
            .oob
            .outstanding
            .as_ref()
            .is_some_and(|send| send.generation == generation);
        if !matches || state.lifecycle.is_closed() {
            log::trace!(target: "netvc", "Out-of-band send {generation} finished after cancellation");
            return;
        }

        let Some(send) = state.oob.outstanding.take() else {
            return;
        };

        let event = match result {
            Ok(()) => VcEvent::OobComplete,
            Err(err) if is_peer_closed(&err) => VcEvent::Eos,
            Err(err) => {
                log::warn!(target: "netvc", "Out-of-band send failed: {err:?}");
                VcEvent::from_io_error(&err)
            }
        };

        state.queue.push_back(Pending::Oob {
            sink: send.sink,
            event,
            generation,
        });
        drop(state);

        self.dispatch();
    }

    /// Fires every expired timer. Expiry is held back while no open direction
    /// has an active operation
    pub fn on_timer_tick(&self) {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() || !state.has_open_io() {
            return;
        }

        let fired = state.timeouts.expire(self.clock.now());
        if fired.is_empty() {
            return;
        }

        for (kind, generation) in fired {
            log::debug!(target: "netvc", "{kind:?} timeout expired");
            state.queue.push_back(Pending::Timeout { kind, generation });
        }

        drop(state);
        self.dispatch();
    }

    /// The earliest armed deadline, if any operation could observe it
    pub fn next_deadline(&self) -> Option<Instant> {
        let state = self.state.lock();
        if state.has_open_io() {
            state.timeouts.next_deadline()
        } else {
            None
        }
    }

    fn log_label(&self) -> String {
        match self.remote_addr() {
            Some(addr) => addr.to_string(),
            None => format!("{:?}", self.kind),
        }
    }

    // -- delivery --

    fn dispatch(&self) {
        {
            let mut state = self.state.lock();
            if state.dispatching.is_some() {
                // the active drainer picks the new events up
                return;
            }

            state.dispatching = Some(std::thread::current().id());
        }

        let _guard = DispatchGuard { vc: self };

        loop {
            let next = {
                let mut state = self.state.lock();
                let popped = state.queue.pop_front();
                match popped {
                    Some(pending) => pending,
                    None => {
                        // cleared under the lock that saw the queue empty
                        state.dispatching = None;
                        let rearm = std::mem::take(&mut state.inline_rearm);
                        drop(state);
                        if rearm {
                            self.notify.notify_one();
                        }
                        return;
                    }
                }
            };

            self.deliver(next);
        }
    }

    fn deliver(&self, pending: Pending) {
        match pending {
            Pending::Io {
                vio,
                event,
                generation,
            } => {
                let mut sink = vio.sink().lock();
                if !self.io_deliverable(&vio, generation) {
                    log::trace!(target: "netvc", "Suppressed {event:?} for stale operation {}", vio.id());
                    return;
                }

                log::trace!(target: "netvc", "Delivering {event:?} to operation {}", vio.id());
                self.log.lock().add(format!("{event:?} id={}", vio.id()));
                let _ = sink.handle_event(event, &vio);
            }

            Pending::Timeout { kind, generation } => self.deliver_timeout(kind, generation),

            Pending::Oob {
                sink,
                event,
                generation,
            } => {
                let mut guard = sink.lock();
                {
                    let state = self.state.lock();
                    if state.lifecycle.is_closed() || generation <= state.oob.cancelled_through {
                        log::trace!(target: "netvc", "Suppressed {event:?} for cancelled out-of-band send");
                        return;
                    }
                }

                let action = OobAction {
                    generation,
                    vc: self.this.clone(),
                };
                self.log.lock().add(format!("{event:?} oob={generation}"));
                let _ = guard.handle_oob_event(event, &action);
            }
        }
    }

    fn io_deliverable(&self, vio: &Vio, generation: u64) -> bool {
        let state = self.state.lock();
        !state.lifecycle.is_closed()
            && state.lifecycle.is_open(vio.op())
            && state.side(vio.op()).generation == generation
    }

    fn timeout_deliverable(&self, kind: TimeoutKind, generation: u64, vio: &Vio) -> bool {
        let state = self.state.lock();
        !state.lifecycle.is_closed()
            && state.timeouts.generation(kind) == generation
            && state.lifecycle.is_open(vio.op())
            && state.side(vio.op()).is_active(vio)
    }

    fn deliver_timeout(&self, kind: TimeoutKind, generation: u64) {
        let event = kind.event();
        let read_target = {
            let state = self.state.lock();
            if state.lifecycle.is_closed() || state.timeouts.generation(kind) != generation {
                log::trace!(target: "netvc", "Suppressed stale {kind:?} timeout");
                return;
            }

            state.open_op(VioOp::Read)
        };

        if let Some(vio) = read_target.as_ref() {
            let mut sink = vio.sink().lock();
            if self.timeout_deliverable(kind, generation, vio) {
                self.log.lock().add(format!("{event:?} id={}", vio.id()));
                if sink.handle_event(event, vio) == EventResult::Done {
                    return;
                }
            }
        }

        let write_target = self.state.lock().open_op(VioOp::Write);
        if let Some(vio) = write_target {
            if read_target
                .as_ref()
                .is_some_and(|read| read.sink().ptr_eq(vio.sink()))
            {
                return;
            }

            let mut sink = vio.sink().lock();
            if self.timeout_deliverable(kind, generation, &vio) {
                self.log.lock().add(format!("{event:?} id={}", vio.id()));
                let _ = sink.handle_event(event, &vio);
            }
        }
    }
}

impl VConnection for NetVConnection {
    fn do_io_read(&self, sink: Sink, nbytes: IoLen, buffer: IoBuffer) -> Result<Vio, VcError> {
        self.issue(sink, nbytes, VioBuffer::Read(buffer), false)
    }

    fn do_io_write(
        &self,
        sink: Sink,
        nbytes: IoLen,
        reader: BufferReader,
        take_ownership: bool,
    ) -> Result<Vio, VcError> {
        self.issue(sink, nbytes, VioBuffer::Write(reader), take_ownership)
    }

    fn reenable(&self, vio: &Vio) -> Result<(), VcError> {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            return Err(VcError::Closed);
        }

        let side = state.side_mut(vio.op());
        if !side.is_active(vio) {
            log::warn!(target: "netvc", "reenable called on retired {:?} operation {}", vio.op(), vio.id());
            return Err(VcError::StaleHandle);
        }

        side.stalled = false;
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    fn reenable_re(&self, vio: &Vio) -> Result<(), VcError> {
        let mut state = self.state.lock();
        if state.dispatching != Some(std::thread::current().id()) {
            return Err(VcError::NotInCallback);
        }

        if state.lifecycle.is_closed() {
            return Err(VcError::Closed);
        }

        let side = state.side_mut(vio.op());
        if !side.is_active(vio) {
            log::warn!(target: "netvc", "reenable_re called on retired {:?} operation {}", vio.op(), vio.id());
            return Err(VcError::StaleHandle);
        }

        side.stalled = false;
        state.inline_rearm = true;
        Ok(())
    }

    fn do_io_close(&self, reason: CloseReason) {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            log::warn!(target: "netvc", "do_io_close called on an already closed connection");
            return;
        }

        state.lifecycle = state.lifecycle.close();
        state.close_reason = Some(reason);
        if let Some(vio) = state.read.retire() {
            log::trace!(target: "netvc", "Close retires read operation {}", vio.id());
        }
        if let Some(vio) = state.write.retire() {
            vio.release_reader();
        }
        state.queue.clear();
        state.timeouts.clear_all();
        state.cancel_oob();
        state.pending_shutdown = None;
        drop(state);

        // the pump keeps its own handle until it has torn the transport down
        let _ = self.transport.write().take();
        log::debug!(target: "netvc", "Connection closed ({reason:?})");
        self.log.lock().add(format!("do_io_close {reason:?}"));
        self.notify.notify_one();
    }

    fn do_io_shutdown(&self, how: ShutdownHowTo) -> Result<(), VcError> {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            return Err(VcError::Closed);
        }

        let before = state.lifecycle;
        state.lifecycle = before.shutdown(how);
        if before == state.lifecycle {
            log::trace!(target: "netvc", "Shutdown({how:?}) changes nothing in {before:?}");
            return Ok(());
        }

        if how.includes_read() && before.read_open() {
            let _ = state.read.retire();
        }

        if how.includes_write() && before.write_open() {
            if let Some(vio) = state.write.retire() {
                vio.release_reader();
            }
            state.cancel_oob();
        }

        state.pending_shutdown = Some(match state.pending_shutdown {
            Some(pending) => pending.merge(how),
            None => how,
        });
        let after = state.lifecycle;
        drop(state);

        log::debug!(target: "netvc", "Shutdown({how:?}): {before:?} -> {after:?}");
        self.log.lock().add(format!("do_io_shutdown {how:?}"));
        self.notify.notify_one();
        Ok(())
    }

    fn send_oob(&self, sink: Sink, data: Bytes) -> Result<OobAction, VcError> {
        let mut state = self.state.lock();
        if state.lifecycle.is_closed() {
            return Err(VcError::Closed);
        }

        if !state.lifecycle.write_open() {
            return Err(VcError::Shutdown(VioOp::Write));
        }

        if state.oob.outstanding.is_some() {
            return Err(VcError::OobInProgress);
        }

        state.oob.generation += 1;
        let generation = state.oob.generation;
        state.oob.outstanding = Some(OobSend {
            sink,
            data,
            generation,
            in_flight: false,
        });
        drop(state);

        self.notify.notify_one();
        Ok(OobAction {
            generation,
            vc: self.this.clone(),
        })
    }

    fn cancel_oob(&self) {
        if self.state.lock().cancel_oob() {
            log::trace!(target: "netvc", "Out-of-band send cancelled");
        }
    }

    fn set_active_timeout(&self, timeout: Duration) {
        self.set_timeout(TimeoutKind::Active, Some(timeout))
    }

    fn set_inactivity_timeout(&self, timeout: Duration) {
        self.set_timeout(TimeoutKind::Inactivity, Some(timeout))
    }

    fn cancel_active_timeout(&self) {
        self.set_timeout(TimeoutKind::Active, None)
    }

    fn cancel_inactivity_timeout(&self) {
        self.set_timeout(TimeoutKind::Inactivity, None)
    }

    fn get_active_timeout(&self) -> Option<Duration> {
        self.state.lock().timeouts.get(TimeoutKind::Active)
    }

    fn get_inactivity_timeout(&self) -> Option<Duration> {
        self.state.lock().timeouts.get(TimeoutKind::Inactivity)
    }

    fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    fn options(&self) -> &NetVcOptions {
        &self.options
    }

    fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    fn raw_socket(&self) -> Option<RawSocketHandle> {
        self.transport.read().as_ref()?.raw_socket()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        if let Some(addr) = self.local_addr.read().get() {
            return Some(addr);
        }

        let transport = self.transport()?;
        self.local_addr
            .write()
            .get_or_resolve(|| transport.local_addr())
            .map_err(|err| log::warn!(target: "netvc", "Unable to resolve local address: {err:?}"))
            .ok()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        if let Some(addr) = self.remote_addr.read().get() {
            return Some(addr);
        }

        let transport = self.transport()?;
        self.remote_addr
            .write()
            .get_or_resolve(|| transport.peer_addr())
            .map_err(|err| log::warn!(target: "netvc", "Unable to resolve remote address: {err:?}"))
            .ok()
    }

    fn is_internal_request(&self) -> bool {
        self.is_internal_request.load(Ordering::Relaxed)
    }

    fn set_is_internal_request(&self, internal: bool) {
        self.is_internal_request.store(internal, Ordering::Relaxed)
    }

    fn attributes(&self) -> u32 {
        self.attributes.load(Ordering::Relaxed)
    }

    fn set_attributes(&self, attributes: u32) {
        self.attributes.store(attributes, Ordering::Relaxed)
    }

    fn logging_init(&self) {
        self.log.lock().init()
    }

    fn logging_enabled(&self) -> bool {
        self.log.lock().enabled()
    }

    fn add_log_message(&self, message: &str) {
        if !self.log.lock().enabled() {
            return;
        }

        let label = self.log_label();
        let _ = self.log.lock().add_and_print(message, &label);
    }

    fn print_logs(&self) {
        let label = self.log_label();
        let _ = self.log.lock().print(&label);
    }

    fn clear_logs(&self) {
        self.log.lock().clear()
    }

    fn logs_total_time(&self) -> Duration {
        self.log.lock().total_time()
    }
}

impl Debug for NetVConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NetVConnection")
            .field("kind", &self.kind)
            .field("lifecycle", &state.lifecycle)
            .field("read", &state.read.active)
            .field("write", &state.write.active)
            .finish()
    }
}

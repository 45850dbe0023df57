//! Active and inactivity timers of a virtual connection.
//!
//! Both timers are deadlines relative to the moment they were set. Setting a
//! timer again re-bases it; cancelling it disarms it. Every set or cancel bumps
//! the timer's generation so that an expiry already queued for delivery can be
//! recognised as stale and dropped.

use crate::event::VcEvent;
use netvc_io::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source driving the connection timers
pub trait TimeoutClock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The process monotonic clock
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl TimeoutClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutClock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    Active,
    Inactivity,
}

impl TimeoutKind {
    pub fn event(self) -> VcEvent {
        match self {
            TimeoutKind::Active => VcEvent::ActiveTimeout,
            TimeoutKind::Inactivity => VcEvent::InactivityTimeout,
        }
    }
}

#[derive(Default, Debug)]
struct Timer {
    duration: Option<Duration>,
    deadline: Option<Instant>,
    generation: u64,
}

impl Timer {
    fn arm(&mut self, duration: Duration, now: Instant) {
        self.duration = Some(duration);
        // a duration past the clock's range never fires
        self.deadline = now.checked_add(duration);
        self.generation += 1;
    }

    fn disarm(&mut self) {
        self.duration = None;
        self.deadline = None;
        self.generation += 1;
    }
}

#[derive(Default, Debug)]
pub struct TimeoutState {
    active: Timer,
    inactivity: Timer,
}

impl TimeoutState {
    fn timer(&self, kind: TimeoutKind) -> &Timer {
        match kind {
            TimeoutKind::Active => &self.active,
            TimeoutKind::Inactivity => &self.inactivity,
        }
    }

    fn timer_mut(&mut self, kind: TimeoutKind) -> &mut Timer {
        match kind {
            TimeoutKind::Active => &mut self.active,
            TimeoutKind::Inactivity => &mut self.inactivity,
        }
    }

    pub fn set(&mut self, kind: TimeoutKind, duration: Duration, now: Instant) {
        self.timer_mut(kind).arm(duration, now)
    }

    pub fn cancel(&mut self, kind: TimeoutKind) {
        self.timer_mut(kind).disarm()
    }

    /// The configured duration, `None` if cancelled or never set
    pub fn get(&self, kind: TimeoutKind) -> Option<Duration> {
        self.timer(kind).duration
    }

    pub fn generation(&self, kind: TimeoutKind) -> u64 {
        self.timer(kind).generation
    }

    /// Progress or newly issued I/O pushes an armed inactivity deadline out
    pub fn touch_inactivity(&mut self, now: Instant) {
        let timer = &mut self.inactivity;
        if let (Some(duration), Some(_)) = (timer.duration, timer.deadline) {
            timer.deadline = now.checked_add(duration);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.active.deadline, self.inactivity.deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Disarms every timer whose deadline has passed and returns it together
    /// with the generation the expiry belongs to. A fired timer does not recur
    /// until it is set again.
    pub fn expire(&mut self, now: Instant) -> Vec<(TimeoutKind, u64)> {
        let mut fired = Vec::new();
        for kind in [TimeoutKind::Active, TimeoutKind::Inactivity] {
            let timer = self.timer_mut(kind);
            if timer.deadline.is_some_and(|deadline| deadline <= now) {
                timer.deadline = None;
                fired.push((kind, timer.generation));
            }
        }

        fired
    }

    pub fn clear_all(&mut self) {
        self.active.disarm();
        self.inactivity.disarm();
    }
}

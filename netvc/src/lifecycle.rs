//! Shutdown / close state machine of a virtual connection.
//!
//! `Closed` is terminal and reachable only through close. Shutting a direction
//! down is permanent; shutting it down again is a no-op.

use crate::event::ShutdownHowTo;
use crate::vio::VioOp;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    #[default]
    Open,
    ReadShutdown,
    WriteShutdown,
    BothShutdown,
    Closed,
}

impl Lifecycle {
    pub fn shutdown(self, how: ShutdownHowTo) -> Self {
        if self == Lifecycle::Closed {
            return self;
        }

        let read_shut = !self.read_open() || how.includes_read();
        let write_shut = !self.write_open() || how.includes_write();

        match (read_shut, write_shut) {
            (true, true) => Lifecycle::BothShutdown,
            (true, false) => Lifecycle::ReadShutdown,
            (false, true) => Lifecycle::WriteShutdown,
            (false, false) => Lifecycle::Open,
        }
    }

    pub fn close(self) -> Self {
        Lifecycle::Closed
    }

    pub fn is_closed(&self) -> bool {
        *self == Lifecycle::Closed
    }

    pub fn read_open(&self) -> bool {
        matches!(self, Lifecycle::Open | Lifecycle::WriteShutdown)
    }

    pub fn write_open(&self) -> bool {
        matches!(self, Lifecycle::Open | Lifecycle::ReadShutdown)
    }

    pub fn is_open(&self, op: VioOp) -> bool {
        match op {
            VioOp::Read => self.read_open(),
            VioOp::Write => self.write_open(),
        }
    }
}

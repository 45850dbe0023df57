//! Runtime seam for the netvc workspace.
//!
//! The connection core takes its lock primitives and its blocking pool from
//! here so that either can be swapped in a single place.
pub mod shared;
pub mod standard;

pub use standard::locks::*;
pub use standard::spawn::spawn_blocking;

#[cfg(feature = "deadlock-detection")]
pub use parking_lot::deadlock;

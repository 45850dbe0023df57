//! Lock primitives backed by parking_lot.
//!
//! Connection state in netvc is guarded by short, non-async critical sections,
//! so the synchronous parking_lot locks are used rather than tokio's.

/// A mutual exclusion primitive useful for protecting shared data.
pub type Mutex<T> = parking_lot::Mutex<T>;

/// RAII guard for a [`Mutex`]. Released when dropped.
pub type MutexGuard<'a, T> = parking_lot::MutexGuard<'a, T>;

/// A reader-writer lock, allowing multiple readers or a single writer at any point in time.
pub type RwLock<T> = parking_lot::RwLock<T>;

/// RAII guard for read access to an [`RwLock`].
pub type RwLockReadGuard<'a, T> = parking_lot::RwLockReadGuard<'a, T>;

/// RAII guard for write access to an [`RwLock`].
pub type RwLockWriteGuard<'a, T> = parking_lot::RwLockWriteGuard<'a, T>;

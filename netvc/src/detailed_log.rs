//! Optional per-connection trace of timestamped messages.
//!
//! A connection carries a [`ConnLog`], which is empty until the state machine
//! asks for detailed logging. Every operation on an empty `ConnLog` is a no-op.

use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
pub struct DetailedLog {
    entries: Vec<(Instant, String)>,
}

impl DetailedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: Into<String>>(&mut self, message: T) {
        self.entries.push((Instant::now(), message.into()))
    }

    /// Emits every entry at debug level, offset from the first entry.
    /// Returns how many entries were emitted
    pub fn print(&self, label: &str) -> usize {
        let Some((start, _)) = self.entries.first() else {
            return 0;
        };

        for (at, message) in &self.entries {
            log::debug!(target: "netvc", "[{label}] +{:?} {message}", at.duration_since(*start));
        }

        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// Time elapsed between the first and the last entry
    pub fn total_time(&self) -> Duration {
        match (self.entries.first(), self.entries.last()) {
            (Some((first, _)), Some((last, _))) => last.duration_since(*first),
            _ => Duration::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, message)| message.as_str())
    }
}

#[derive(Debug, Default)]
pub struct ConnLog {
    inner: Option<DetailedLog>,
}

impl ConnLog {
    pub fn init(&mut self) {
        if self.inner.is_none() {
            self.inner = Some(DetailedLog::new())
        }
    }

    pub fn enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn add<T: Into<String>>(&mut self, message: T) {
        if let Some(log) = self.inner.as_mut() {
            log.add(message)
        }
    }

    pub fn print(&self, label: &str) -> usize {
        self.inner.as_ref().map_or(0, |log| log.print(label))
    }

    /// Records `message` and dumps the whole log right away
    pub fn add_and_print<T: Into<String>>(&mut self, message: T, label: &str) -> usize {
        self.add(message);
        self.print(label)
    }

    pub fn clear(&mut self) {
        if let Some(log) = self.inner.as_mut() {
            log.clear()
        }
    }

    pub fn total_time(&self) -> Duration {
        self.inner
            .as_ref()
            .map(DetailedLog::total_time)
            .unwrap_or_default()
    }

    pub fn get(&self) -> Option<&DetailedLog> {
        self.inner.as_ref()
    }
}

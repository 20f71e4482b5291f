//! Collaborators injected into a [`Diagram`](crate::Diagram).
//!
//! The engine never talks to a user interface, a wall clock, or a global
//! random generator directly. Everything it needs from the outside world is
//! passed in through [`DiagramServices`].

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use uuid::Uuid;

/// Receives user-facing error messages.
pub trait Notifier {
    /// Report an error message to the user.
    fn error(&self, message: &str);
}

/// Forwards messages to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(message, "Diagram notification");
    }
}

/// Keeps every message so a host can drain and display them later.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingNotifier {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return every message received so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for CollectingNotifier {
    fn error(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Produces fresh, unique entity identifiers.
pub trait IdGenerator {
    /// Return an id that has never been returned before.
    fn next_id(&mut self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Predictable `prefix-N` identifiers.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    /// Start counting from zero with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Supplies the elapsed time used to evaluate clock-powered nodes.
///
/// Values must be non-decreasing between calls.
pub trait TimeSource {
    /// Milliseconds since the source's epoch.
    fn elapsed_ms(&self) -> f64;
}

/// Elapsed wall-clock time since a start instant.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    start: Instant,
}

impl SystemTimeSource {
    /// Start counting from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Restart the epoch at `start`.
    pub fn reset_start(&mut self, start: Instant) {
        self.start = start;
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// A frozen point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedTime(pub f64);

impl TimeSource for FixedTime {
    fn elapsed_ms(&self) -> f64 {
        self.0
    }
}

/// Every external collaborator of a diagram.
pub struct DiagramServices {
    /// Receives user-facing error messages
    pub notifier: Box<dyn Notifier>,
    /// Generates entity ids
    pub ids: Box<dyn IdGenerator>,
    /// Time origin for clock-powered nodes
    pub time: Box<dyn TimeSource>,
    /// Scheduling jitter and paste offsets
    pub rng: Box<dyn RngCore>,
}

impl DiagramServices {
    /// Default services with a deterministic random source.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            ..Self::default()
        }
    }

    /// Replace the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Replace the id generator.
    #[must_use]
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_time(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Box::new(time);
        self
    }

    /// Replace the random source.
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }
}

impl Default for DiagramServices {
    fn default() -> Self {
        Self {
            notifier: Box::new(TracingNotifier),
            ids: Box::new(UuidIds),
            time: Box::new(SystemTimeSource::new()),
            rng: Box::new(StdRng::from_entropy()),
        }
    }
}

impl std::fmt::Debug for DiagramServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramServices")
            .field("elapsed_ms", &self.time.elapsed_ms())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_notifier_shares_buffer() {
        let notifier = CollectingNotifier::new();
        let handle = notifier.clone();

        notifier.error("first");
        notifier.error("second");

        assert_eq!(handle.messages(), vec!["first", "second"]);
        assert_eq!(handle.drain().len(), 2);
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn sequential_ids_are_unique() {
        let mut ids = SequentialIds::new("n");
        assert_eq!(ids.next_id(), "n-0");
        assert_eq!(ids.next_id(), "n-1");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let mut ids = UuidIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }

    #[test]
    fn system_time_is_monotonic() {
        let time = SystemTimeSource::new();
        let first = time.elapsed_ms();
        let second = time.elapsed_ms();
        assert!(second >= first);
    }
}

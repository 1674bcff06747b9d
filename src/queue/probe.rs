//! Claim probe: reports each step of the sequence/CAS protocol.
//!
//! Every report goes to `insights` (tracing, zero-cost when disabled). With
//! `cfg(test)` or the `instrument` feature a queue can also carry a
//! [`ClaimHook`] that runs inline at the reported point, which lets a test
//! interleave a competing operation between the sequence load and the CAS.

/// Which side of the queue is claiming a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

/// A step of the claim loop, tagged with the position being claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimEvent {
    /// Position counter read; the slot sequence has not been loaded yet.
    Loaded(usize),
    /// Slot sequence matched the position; the CAS is about to run.
    Ready(usize),
    /// Slot is already ahead of the cached position; reloading.
    Stale(usize),
    /// Another thread won the CAS for this position.
    Contended(usize),
    /// Queue observed full (producer) or empty (consumer).
    Exhausted(usize),
}

impl ClaimEvent {
    pub fn position(&self) -> usize {
        match *self {
            ClaimEvent::Loaded(pos)
            | ClaimEvent::Ready(pos)
            | ClaimEvent::Stale(pos)
            | ClaimEvent::Contended(pos)
            | ClaimEvent::Exhausted(pos) => pos,
        }
    }
}

/// Callback run inline at every claim step of a queue.
#[cfg(any(test, feature = "instrument"))]
pub type ClaimHook<T> =
    Box<dyn Fn(&super::BoundedMpmcQueue<T>, Role, ClaimEvent) + Send + Sync>;

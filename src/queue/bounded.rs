//! Bounded MPMC (Multi-Producer Multi-Consumer) Queue
//!
//! Fixed ring of slots, each carrying a sequence number that acts as a
//! turnstile between producers and consumers.
//! - Producers claim positions by CAS on `enqueue_pos`
//! - Consumers claim positions by CAS on `dequeue_pos`
//! - The two counters never synchronize with each other; all cross-role
//!   ordering goes through a slot's sequence (Acquire load / Release store)
//!
//! Ordering is FIFO per slot, not across producers: a producer that loses a
//! CAS race moves on to the next position.

use std::fmt;

#[cfg(not(loom))]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
use loom::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

#[cfg(any(test, feature = "instrument"))]
use super::probe::ClaimHook;
use super::probe::{ClaimEvent, Role};
use super::slot::Slot;
use crate::constants::{DEFAULT_CAPACITY, MIN_CAPACITY};
use crate::error::{Full, Result, TurnstileError};
use crate::insights;

/// Fixed-capacity lock-free queue shared by any number of producers and consumers.
pub struct BoundedMpmcQueue<T> {
    buffer: Box<[Slot<T>]>,
    mask: usize,
    enqueue_pos: CachePadded<AtomicUsize>,
    dequeue_pos: CachePadded<AtomicUsize>,
    #[cfg(any(test, feature = "instrument"))]
    hook: Option<ClaimHook<T>>,
}

impl<T> BoundedMpmcQueue<T> {
    /// Create a queue holding at most `capacity` values.
    ///
    /// `capacity` must be a power of two and at least 2. Anything else is
    /// rejected, never rounded.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < MIN_CAPACITY {
            return Err(TurnstileError::capacity(capacity, "must be at least 2"));
        }
        if !capacity.is_power_of_two() {
            return Err(TurnstileError::capacity(capacity, "must be a power of two"));
        }

        Ok(Self::allocate(capacity))
    }

    fn allocate(capacity: usize) -> Self {
        // Lap 0: every slot is write-ready for its own index.
        let buffer = (0..capacity).map(Slot::new).collect::<Vec<_>>().into_boxed_slice();

        Self {
            buffer,
            mask: capacity - 1,
            enqueue_pos: CachePadded::new(AtomicUsize::new(0)),
            dequeue_pos: CachePadded::new(AtomicUsize::new(0)),
            #[cfg(any(test, feature = "instrument"))]
            hook: None,
        }
    }

    /// Create a queue that runs `hook` inline at every claim step.
    #[cfg(any(test, feature = "instrument"))]
    pub fn with_claim_hook<F>(capacity: usize, hook: F) -> Result<Self>
    where
        F: Fn(&Self, Role, ClaimEvent) + Send + Sync + 'static,
    {
        let mut queue = Self::new(capacity)?;
        queue.hook = Some(Box::new(hook));
        Ok(queue)
    }

    /// Try to append `value`.
    ///
    /// Returns `Err(Full(value))` with the value untouched if the queue was
    /// observed full. Never blocks and never retries on full.
    pub fn try_enqueue(&self, value: T) -> std::result::Result<(), Full<T>> {
        // Relaxed: only a starting guess. The slot's Acquire load below is
        // what orders this thread against the consumer of the previous lap.
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);

        loop {
            self.observe(Role::Producer, ClaimEvent::Loaded(pos));
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                self.observe(Role::Producer, ClaimEvent::Ready(pos));
                // Relaxed CAS: the counter only arbitrates ownership of the
                // position; data visibility rides on the slot sequence.
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS gave this thread exclusive ownership
                        // of `pos`, and sequence == pos means the slot is empty.
                        unsafe { slot.write(value) };
                        // Publish: Release pairs with the consumer's Acquire load.
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => {
                        self.observe(Role::Producer, ClaimEvent::Contended(pos));
                        pos = current;
                    }
                }
            } else if diff < 0 {
                // Slot still holds last lap's value: full.
                self.observe(Role::Producer, ClaimEvent::Exhausted(pos));
                return Err(Full(value));
            } else {
                self.observe(Role::Producer, ClaimEvent::Stale(pos));
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Try to remove the oldest value of the next ready slot.
    ///
    /// Returns `None` if the queue was observed empty.
    pub fn try_dequeue(&self) -> Option<T> {
        // Relaxed: same reasoning as in `try_enqueue`.
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);

        loop {
            self.observe(Role::Consumer, ClaimEvent::Loaded(pos));
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if diff == 0 {
                self.observe(Role::Consumer, ClaimEvent::Ready(pos));
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: sequence == pos + 1 was published with Release
                        // after the write, and the CAS makes this the only reader.
                        let value = unsafe { slot.take() };
                        // Hand the slot to the producer of the next lap.
                        slot.sequence.store(pos.wrapping_add(self.mask + 1), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => {
                        self.observe(Role::Consumer, ClaimEvent::Contended(pos));
                        pos = current;
                    }
                }
            } else if diff < 0 {
                self.observe(Role::Consumer, ClaimEvent::Exhausted(pos));
                return None;
            } else {
                self.observe(Role::Consumer, ClaimEvent::Stale(pos));
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Maximum number of resident values, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of resident values. A snapshot only; concurrent operations may
    /// change it before the caller looks at it.
    pub fn len(&self) -> usize {
        loop {
            let tail = self.enqueue_pos.load(Ordering::Acquire);
            let head = self.dequeue_pos.load(Ordering::Acquire);

            // head <= tail only holds if tail did not move in between.
            if self.enqueue_pos.load(Ordering::Acquire) == tail {
                return tail.wrapping_sub(head).min(self.capacity());
            }
        }
    }

    /// Snapshot check; see [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot check; a following `try_enqueue` may still succeed.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[inline(always)]
    fn observe(&self, role: Role, event: ClaimEvent) {
        insights::record_claim(role, event);

        #[cfg(any(test, feature = "instrument"))]
        if let Some(hook) = &self.hook {
            hook(self, role, event);
        }
    }
}

impl<T> Default for BoundedMpmcQueue<T> {
    fn default() -> Self {
        Self::allocate(DEFAULT_CAPACITY)
    }
}

impl<T> Drop for BoundedMpmcQueue<T> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<T>() {
            return;
        }

        let tail = self.enqueue_pos.load(Ordering::Relaxed);
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);

        while pos != tail {
            let slot = &self.buffer[pos & self.mask];
            if slot.sequence.load(Ordering::Relaxed) == pos.wrapping_add(1) {
                // SAFETY: `&mut self` excludes every other thread, and the
                // sequence says this lap's value was published and never taken.
                unsafe { slot.drop_in_place() };
            }
            pos = pos.wrapping_add(1);
        }
    }
}

impl<T> fmt::Debug for BoundedMpmcQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedMpmcQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

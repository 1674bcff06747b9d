//! Ring slot: a sequence turnstile plus storage for one value.
//!
//! For ring index `i` on lap `k`:
//! - `sequence == k * capacity + i`      write-ready
//! - `sequence == k * capacity + i + 1`  read-ready, value initialised
//! - after the read, `sequence` moves to `(k + 1) * capacity + i`
//!
//! Spacing laps by a full `capacity` means a thread holding a stale position
//! can never see a sequence equal to its own claim target.

use std::mem::MaybeUninit;

#[cfg(not(loom))]
use std::cell::UnsafeCell;
#[cfg(not(loom))]
use std::sync::atomic::AtomicUsize;

#[cfg(loom)]
use loom::cell::UnsafeCell;
#[cfg(loom)]
use loom::sync::atomic::AtomicUsize;

pub(crate) struct Slot<T> {
    pub(crate) sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new(sequence: usize) -> Self {
        Self {
            sequence: AtomicUsize::new(sequence),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[cfg(not(loom))]
    #[inline(always)]
    fn with_value<R>(&self, f: impl FnOnce(*mut MaybeUninit<T>) -> R) -> R {
        f(self.value.get())
    }

    // Under loom every payload access is checked against the sequence
    // happens-before edges.
    #[cfg(loom)]
    fn with_value<R>(&self, f: impl FnOnce(*mut MaybeUninit<T>) -> R) -> R {
        self.value.with_mut(f)
    }

    /// # Safety
    /// Caller won the producer CAS for this slot's current lap and the slot
    /// holds no value.
    #[inline]
    pub(crate) unsafe fn write(&self, value: T) {
        self.with_value(|ptr| unsafe {
            (*ptr).write(value);
        });
    }

    /// # Safety
    /// Caller won the consumer CAS for this slot's current lap, so the value
    /// is initialised and nobody else will read it.
    #[inline]
    pub(crate) unsafe fn take(&self) -> T {
        self.with_value(|ptr| unsafe { (*ptr).assume_init_read() })
    }

    /// # Safety
    /// Slot must hold an initialised value that no thread will take.
    #[inline]
    pub(crate) unsafe fn drop_in_place(&self) {
        self.with_value(|ptr| unsafe { (*ptr).assume_init_drop() });
    }
}

unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_slot_write_take() {
        let slot = Slot::new(5);
        assert_eq!(slot.sequence.load(Ordering::Relaxed), 5);

        unsafe { slot.write(String::from("x")) };
        let value = unsafe { slot.take() };
        assert_eq!(value, "x");
    }
}

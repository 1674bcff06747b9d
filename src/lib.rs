//! # turnstile
//!
//! Bounded lock-free multi-producer multi-consumer queue.
//!
//! A fixed ring of slots, each guarded by a sequence number (the
//! "turnstile") that says which lap owns the slot and whether it is waiting
//! for a write or a read. Producers and consumers claim positions with a CAS
//! on their own counter and meet only at a slot's sequence.
//!
//! ```rust
//! use turnstile::BoundedMpmcQueue;
//!
//! let queue = BoundedMpmcQueue::new(4).unwrap();
//! queue.try_enqueue(1u64).unwrap();
//! assert_eq!(queue.try_dequeue(), Some(1));
//! assert_eq!(queue.try_dequeue(), None);
//! ```
//!
//! The queue never waits. Retry policy on full/empty belongs to the caller;
//! [`wait`] has ready-made strategies.
//!
//! ## Features
//!
//! - `tracing` - trace slow-path claim steps (stale positions, lost races, full/empty)
//! - `tracy` - Tracy profiler integration
//! - `instrument` - `BoundedMpmcQueue::with_claim_hook` outside of unit tests

pub mod constants;
pub mod error;
pub mod insights;
pub mod queue;
pub mod wait;

pub use error::{Full, Result, TurnstileError};
pub use insights::init_tracy;
pub use queue::{BoundedMpmcQueue, ClaimEvent, Role};
pub use wait::{
    BackoffWaitStrategy,
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    SleepingWaitStrategy,
    WaitStrategy,
    YieldingWaitStrategy,
};

//! Bounded lock-free MPMC queue.
//!
//! - `BoundedMpmcQueue<T>` - fixed capacity, any number of producers and consumers
//! - `Role` / `ClaimEvent` - claim-loop steps reported to `insights` and test hooks

pub mod bounded;
pub mod probe;
mod slot;

pub use bounded::BoundedMpmcQueue;
pub use probe::{ClaimEvent, Role};

#[cfg(any(test, feature = "instrument"))]
pub use probe::ClaimHook;

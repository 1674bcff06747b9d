//! Turnstile Constants
//!
//! Sizing constants shared by the queue and its callers.

/// Default queue capacity (must be power of 2)
pub const DEFAULT_CAPACITY: usize = 1024;

/// Smallest capacity the sequence protocol supports
pub const MIN_CAPACITY: usize = 2;

/// Cache line size the position counters are padded to (64 bytes on most CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

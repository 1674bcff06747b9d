//! # turnstile-test-support
//!
//! Testing infrastructure for the turnstile queue.
//!
//! ## Components
//!
//! - **Transport** - the two operations a benchmark needs, for any queue
//! - **BlockingQueue** - mutex/condvar baseline to compare against
//! - **run_benchmark** - N producers, M consumers, completion counter, report
//! - **Verifier** - every tagged value consumed exactly once

pub mod blocking;
pub mod cpu;
pub mod stress;
pub mod transport;
pub mod verify;

pub use blocking::BlockingQueue;
pub use stress::{print_summary, run_benchmark, BenchConfig, BenchCounters, BenchReport, LatencySummary, WaitKind};
pub use transport::Transport;
pub use verify::{Verification, Verifier};

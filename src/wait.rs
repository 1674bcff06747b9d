//! Wait strategies for queue callers
//!
//! The queue never waits: a full or empty observation returns at once. This
//! module layers caller-side retry policies on top of `try_enqueue` and
//! `try_dequeue`. Each strategy trades latency against CPU usage.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Full, Result, TurnstileError};
use crate::queue::BoundedMpmcQueue;

/// Trait for strategies that decide what a caller does between failed tries
pub trait WaitStrategy: Send + Sync {
    /// Called after the `attempt`-th consecutive failed try (0-based).
    fn idle(&self, attempt: u32);

    /// Wake callers parked inside `idle`. Called after every successful
    /// operation by the helpers in this module.
    fn signal_all_when_blocking(&self) {}
}

/// Busy spin - lowest latency, burns a core while waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    #[inline]
    fn idle(&self, _attempt: u32) {
        std::hint::spin_loop();
    }
}

/// Spin, then yield, then short sleeps.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
    yield_tries: u32,
}

impl YieldingWaitStrategy {
    pub fn new() -> Self {
        Self {
            spin_tries: 100,
            yield_tries: 10,
        }
    }

    pub fn with_tries(spin_tries: u32, yield_tries: u32) -> Self {
        Self {
            spin_tries,
            yield_tries,
        }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn idle(&self, attempt: u32) {
        if attempt < self.spin_tries {
            std::hint::spin_loop();
        } else if attempt < self.spin_tries.saturating_add(self.yield_tries) {
            thread::yield_now();
        } else {
            thread::sleep(Duration::from_micros(1));
        }
    }
}

/// Fixed sleep between tries - lowest CPU usage, highest latency.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    sleep_duration: Duration,
}

impl SleepingWaitStrategy {
    pub fn new(sleep_duration: Duration) -> Self {
        Self { sleep_duration }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn idle(&self, _attempt: u32) {
        thread::sleep(self.sleep_duration);
    }
}

/// Exponential backoff: `1 << attempt` spins up to `spin_limit`, then yield.
#[derive(Debug, Clone, Copy)]
pub struct BackoffWaitStrategy {
    spin_limit: u32,
}

impl BackoffWaitStrategy {
    pub fn new() -> Self {
        Self { spin_limit: 6 }
    }

    pub fn with_spin_limit(spin_limit: u32) -> Self {
        // Capped so the shift in `idle` stays in range.
        Self {
            spin_limit: spin_limit.min(16),
        }
    }
}

impl Default for BackoffWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BackoffWaitStrategy {
    fn idle(&self, attempt: u32) {
        if attempt <= self.spin_limit {
            for _ in 0..1u32 << attempt {
                std::hint::spin_loop();
            }
        } else {
            thread::yield_now();
        }
    }
}

/// Spin briefly, then park on a condition variable until signalled.
///
/// Waits are bounded, so a signal that races with parking costs at most one
/// `park_timeout` of latency.
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condition: Condvar,
    spin_tries: u32,
    park_timeout: Duration,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_micros(100))
    }

    pub fn with_timeout(park_timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condition: Condvar::new(),
            spin_tries: 100,
            park_timeout,
        }
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn idle(&self, attempt: u32) {
        if attempt < self.spin_tries {
            std::hint::spin_loop();
            return;
        }

        let mut guard = self.mutex.lock();
        self.condition.wait_for(&mut guard, self.park_timeout);
    }

    fn signal_all_when_blocking(&self) {
        self.condition.notify_all();
    }
}

/// Enqueue, retrying with `wait` until space frees up.
pub fn enqueue<T, W: WaitStrategy + ?Sized>(queue: &BoundedMpmcQueue<T>, mut value: T, wait: &W) {
    let mut attempt = 0u32;
    loop {
        match queue.try_enqueue(value) {
            Ok(()) => {
                wait.signal_all_when_blocking();
                return;
            }
            Err(Full(rejected)) => {
                value = rejected;
                wait.idle(attempt);
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// Dequeue, retrying with `wait` until a value arrives.
pub fn dequeue<T, W: WaitStrategy + ?Sized>(queue: &BoundedMpmcQueue<T>, wait: &W) -> T {
    let mut attempt = 0u32;
    loop {
        if let Some(value) = queue.try_dequeue() {
            wait.signal_all_when_blocking();
            return value;
        }
        wait.idle(attempt);
        attempt = attempt.saturating_add(1);
    }
}

/// Enqueue, giving the value back if the queue is still full at `timeout`.
pub fn enqueue_timeout<T, W: WaitStrategy + ?Sized>(
    queue: &BoundedMpmcQueue<T>,
    mut value: T,
    wait: &W,
    timeout: Duration,
) -> std::result::Result<(), Full<T>> {
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;
    loop {
        match queue.try_enqueue(value) {
            Ok(()) => {
                wait.signal_all_when_blocking();
                return Ok(());
            }
            Err(Full(rejected)) => {
                if Instant::now() >= deadline {
                    return Err(Full(rejected));
                }
                value = rejected;
                wait.idle(attempt);
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// Dequeue, failing with `TurnstileError::Timeout` if nothing arrives in time.
pub fn dequeue_timeout<T, W: WaitStrategy + ?Sized>(
    queue: &BoundedMpmcQueue<T>,
    wait: &W,
    timeout: Duration,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;
    loop {
        if let Some(value) = queue.try_dequeue() {
            wait.signal_all_when_blocking();
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(TurnstileError::Timeout);
        }
        wait.idle(attempt);
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_strategies_idle_without_panicking() {
        let strategies: Vec<Box<dyn WaitStrategy>> = vec![
            Box::new(BusySpinWaitStrategy::new()),
            Box::new(YieldingWaitStrategy::with_tries(2, 2)),
            Box::new(SleepingWaitStrategy::new(Duration::from_nanos(1))),
            Box::new(BackoffWaitStrategy::with_spin_limit(40)),
            Box::new(BlockingWaitStrategy::with_timeout(Duration::from_micros(1))),
        ];
        for strategy in &strategies {
            for attempt in 0..200 {
                strategy.idle(attempt);
            }
            strategy.signal_all_when_blocking();
        }
    }

    #[test]
    fn test_dequeue_timeout_on_empty() {
        let queue = BoundedMpmcQueue::<u64>::new(4).unwrap();
        let start = Instant::now();
        let result = dequeue_timeout(&queue, &YieldingWaitStrategy::new(), Duration::from_millis(5));

        assert!(matches!(result, Err(TurnstileError::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_enqueue_timeout_returns_value() {
        let queue = BoundedMpmcQueue::new(2).unwrap();
        queue.try_enqueue(1u64).unwrap();
        queue.try_enqueue(2).unwrap();

        let result = enqueue_timeout(&queue, 3, &BackoffWaitStrategy::new(), Duration::from_millis(2));
        assert_eq!(result.unwrap_err().into_inner(), 3);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_blocking_strategy_hands_off_between_threads() {
        let queue = Arc::new(BoundedMpmcQueue::<u64>::new(2).unwrap());
        let wait = Arc::new(BlockingWaitStrategy::new());
        let count = 10_000u64;

        let (q, w) = (queue.clone(), wait.clone());
        let producer = thread::spawn(move || {
            for i in 0..count {
                enqueue(&*q, i, &*w);
            }
        });

        // Single producer, single consumer: order is preserved end to end.
        for expected in 0..count {
            assert_eq!(dequeue(&*queue, &*wait), expected);
        }
        producer.join().unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_timeout_receives_late_value() {
        let queue = Arc::new(BoundedMpmcQueue::<u64>::new(4).unwrap());
        let q = queue.clone();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            q.try_enqueue(42).unwrap();
        });

        let wait = SleepingWaitStrategy::new(Duration::from_micros(50));
        let value = dequeue_timeout(&*queue, &wait, Duration::from_secs(5));
        assert_eq!(value.unwrap(), 42);
        producer.join().unwrap();
    }
}

//! Mutex + condition variable queue used as a benchmark baseline.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use turnstile::{Result, TurnstileError};

use crate::transport::Transport;

/// How long `poll` waits for a value before reporting empty
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

pub struct BlockingQueue<T> {
    queue: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    poll_timeout: Duration,
}

impl<T> BlockingQueue<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_poll_timeout(capacity, DEFAULT_POLL_TIMEOUT)
    }

    pub fn with_poll_timeout(capacity: usize, poll_timeout: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(TurnstileError::capacity(capacity, "must be greater than 0"));
        }

        Ok(Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            poll_timeout,
        })
    }

    /// Append `value`, blocking while the queue is full.
    pub fn put(&self, value: T) {
        let mut queue = self.queue.lock();
        while queue.len() >= self.capacity {
            self.not_full.wait(&mut queue);
        }
        queue.push_back(value);
        drop(queue);
        self.not_empty.notify_one();
    }

    /// Take the oldest value, waiting up to the poll timeout for one to arrive.
    pub fn take(&self) -> Option<T> {
        // Bounded so consumers notice the end of a run.
        let deadline = Instant::now() + self.poll_timeout;
        let mut queue = self.queue.lock();
        while queue.is_empty() {
            if self.not_empty.wait_until(&mut queue, deadline).timed_out() {
                break;
            }
        }
        let value = queue.pop_front()?;
        drop(queue);
        self.not_full.notify_one();
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Send> Transport<T> for BlockingQueue<T> {
    fn name(&self) -> &'static str {
        "Standard Mutex Queue"
    }

    fn offer(&self, value: T) -> std::result::Result<(), T> {
        self.put(value);
        Ok(())
    }

    fn poll(&self) -> Option<T> {
        self.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_rejects_zero_capacity() {
        assert!(BlockingQueue::<u64>::new(0).is_err());
    }

    #[test]
    fn test_take_times_out_when_empty() {
        let queue = BlockingQueue::<u64>::with_poll_timeout(4, Duration::from_millis(2)).unwrap();
        let start = Instant::now();
        assert_eq!(queue.take(), None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_take_ignores_wakeup_without_value() {
        let queue = Arc::new(BlockingQueue::with_poll_timeout(4, Duration::from_secs(5)).unwrap());

        let q = queue.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            // Wake the waiting consumer with nothing queued.
            q.not_empty.notify_all();
            thread::sleep(Duration::from_millis(20));
            q.put(7u64);
        });

        assert_eq!(queue.take(), Some(7));
        waker.join().unwrap();
    }

    #[test]
    fn test_put_blocks_until_space() {
        let queue = Arc::new(BlockingQueue::new(1).unwrap());
        queue.put(1u64);

        let q = queue.clone();
        let producer = thread::spawn(move || q.put(2));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take(), Some(1));

        producer.join().unwrap();
        assert_eq!(queue.take(), Some(2));
        assert!(queue.is_empty());
    }
}

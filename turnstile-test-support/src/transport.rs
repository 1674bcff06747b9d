//! Queue surface used by the benchmark driver.

use turnstile::{BoundedMpmcQueue, Full};

/// Anything that can move values between producer and consumer threads.
pub trait Transport<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Hand `value` over, or give it back if there is no room right now.
    fn offer(&self, value: T) -> Result<(), T>;

    /// Take the next value, or `None` if nothing is available right now.
    fn poll(&self) -> Option<T>;
}

impl<T: Send> Transport<T> for BoundedMpmcQueue<T> {
    fn name(&self) -> &'static str {
        "Lock-Free MPMC Queue"
    }

    #[inline]
    fn offer(&self, value: T) -> Result<(), T> {
        self.try_enqueue(value).map_err(Full::into_inner)
    }

    #[inline]
    fn poll(&self) -> Option<T> {
        self.try_dequeue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_transport_gives_value_back_when_full() {
        let queue = BoundedMpmcQueue::new(2).unwrap();
        assert!(queue.offer(1u64).is_ok());
        assert!(queue.offer(2).is_ok());
        assert_eq!(queue.offer(3), Err(3));
        assert_eq!(queue.poll(), Some(1));
    }
}

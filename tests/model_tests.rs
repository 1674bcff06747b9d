//! Single-threaded model check: any sequence of operations on the queue
//! behaves like a `VecDeque` bounded to the same capacity.

#![cfg(not(loom))]

use proptest::prelude::*;
use std::collections::VecDeque;

use turnstile::BoundedMpmcQueue;

#[derive(Debug, Clone)]
enum Op {
    Enqueue(u32),
    Dequeue,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u32>().prop_map(Op::Enqueue), Just(Op::Dequeue)]
}

proptest! {
    #[test]
    fn queue_matches_bounded_deque(
        capacity_log2 in 1u32..6,
        ops in prop::collection::vec(op(), 0..400),
    ) {
        let capacity = 1usize << capacity_log2;
        let queue = BoundedMpmcQueue::new(capacity).unwrap();
        let mut model = VecDeque::with_capacity(capacity);

        for op in ops {
            match op {
                Op::Enqueue(value) => {
                    let result = queue.try_enqueue(value);
                    if model.len() < capacity {
                        prop_assert!(result.is_ok());
                        model.push_back(value);
                    } else {
                        prop_assert_eq!(result.unwrap_err().into_inner(), value);
                    }
                }
                Op::Dequeue => {
                    prop_assert_eq!(queue.try_dequeue(), model.pop_front());
                }
            }
            prop_assert_eq!(queue.len(), model.len());
            prop_assert_eq!(queue.is_full(), model.len() == capacity);
        }
    }

    #[test]
    fn invalid_capacities_are_rejected(capacity in 0usize..100_000) {
        let valid = capacity >= 2 && capacity.is_power_of_two();
        prop_assert_eq!(BoundedMpmcQueue::<u8>::new(capacity).is_ok(), valid);
    }
}

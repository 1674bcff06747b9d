//! Multi-Producer/Consumer contention benchmarks
//!
//! Same workload through the turnstile queue and crossbeam's `ArrayQueue`
//! as a reference point.
//!
//! Run: cargo bench --bench bench_contention

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crossbeam::queue::ArrayQueue;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use turnstile::BoundedMpmcQueue;

const CAPACITY: usize = 1024;
const TOTAL_EVENTS: u64 = 400_000;

/// Minimal surface shared by both queues
trait BenchQueue: Send + Sync + 'static {
    fn push(&self, value: u64) -> bool;
    fn pop(&self) -> Option<u64>;
}

impl BenchQueue for BoundedMpmcQueue<u64> {
    #[inline]
    fn push(&self, value: u64) -> bool {
        self.try_enqueue(value).is_ok()
    }

    #[inline]
    fn pop(&self) -> Option<u64> {
        self.try_dequeue()
    }
}

impl BenchQueue for ArrayQueue<u64> {
    #[inline]
    fn push(&self, value: u64) -> bool {
        ArrayQueue::push(self, value).is_ok()
    }

    #[inline]
    fn pop(&self) -> Option<u64> {
        ArrayQueue::pop(self)
    }
}

fn run<Q: BenchQueue>(queue: Arc<Q>, producers: u64, consumers: u64) -> u64 {
    let per_producer = TOTAL_EVENTS / producers;
    let total = per_producer * producers;
    let consumed = Arc::new(AtomicU64::new(0));

    let producer_handles: Vec<_> = (0..producers)
        .map(|id| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..per_producer {
                    let value = id * per_producer + i;
                    while !queue.push(value) {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let queue = queue.clone();
            let consumed = consumed.clone();
            thread::spawn(move || {
                while consumed.load(Ordering::Relaxed) < total {
                    if let Some(value) = queue.pop() {
                        black_box(value);
                        consumed.fetch_add(1, Ordering::Relaxed);
                    } else {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();

    for handle in producer_handles {
        handle.join().unwrap();
    }
    for handle in consumer_handles {
        handle.join().unwrap();
    }
    consumed.load(Ordering::Relaxed)
}

fn benchmark_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("Contention");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(10);

    for (producers, consumers) in [(1u64, 1u64), (2, 2), (4, 4)] {
        let label = format!("{}P{}C", producers, consumers);

        group.bench_function(BenchmarkId::new("turnstile", &label), |b| {
            b.iter(|| run(Arc::new(BoundedMpmcQueue::<u64>::new(CAPACITY).unwrap()), producers, consumers))
        });

        group.bench_function(BenchmarkId::new("crossbeam-array", &label), |b| {
            b.iter(|| run(Arc::new(ArrayQueue::<u64>::new(CAPACITY)), producers, consumers))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_contention);
criterion_main!(benches);

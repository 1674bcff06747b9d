//! Benchmark driver: N producers, M consumers, one shared completion counter.
//!
//! Producers send tagged values and retry on full; consumers retry on empty
//! until the completion counter reaches the expected total. Both retry loops
//! use a pluggable `WaitStrategy`, which is the caller-side policy the queue
//! itself leaves out.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use rand::Rng;
use turnstile::{
    BackoffWaitStrategy,
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    Result,
    TurnstileError,
    WaitStrategy,
    YieldingWaitStrategy,
};

use crate::cpu;
use crate::transport::Transport;
use crate::verify::{Verification, Verifier};

/// Highest latency the histograms track (10 s in ns)
const MAX_TRACKED_LATENCY_NS: u64 = 10_000_000_000;

/// Configuration for a benchmark run
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of producer threads
    pub producers: usize,
    /// Number of consumer threads
    pub consumers: usize,
    /// Values sent by each producer
    pub items_per_producer: u64,
    /// Queue capacity (power of 2 for the lock-free queue)
    pub capacity: usize,
    /// Time every Nth operation per thread (0 = no latency sampling)
    pub sample_every: u64,
    /// Pin each worker thread to its own core
    pub pin_threads: bool,
    /// Probability that a producer yields after a send (0 = never)
    pub jitter: f64,
    /// Log progress every interval
    pub report_interval: Duration,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: 4,
            items_per_producer: 100_000,
            capacity: 1024,
            sample_every: 64,
            pin_threads: false,
            jitter: 0.0,
            report_interval: Duration::from_secs(1),
        }
    }
}

impl BenchConfig {
    pub fn new(producers: usize, consumers: usize, items_per_producer: u64) -> Self {
        Self {
            producers,
            consumers,
            items_per_producer,
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_sample_every(mut self, n: u64) -> Self {
        self.sample_every = n;
        self
    }

    pub fn with_pinning(mut self, pin: bool) -> Self {
        self.pin_threads = pin;
        self
    }

    pub fn with_jitter(mut self, probability: f64) -> Self {
        self.jitter = probability;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn total_items(&self) -> u64 {
        self.producers as u64 * self.items_per_producer
    }

    pub fn validate(&self) -> Result<()> {
        if self.producers == 0 {
            return Err(TurnstileError::config("Number of producers must be greater than 0"));
        }
        if self.consumers == 0 {
            return Err(TurnstileError::config("Number of consumers must be greater than 0"));
        }
        if self.items_per_producer == 0 {
            return Err(TurnstileError::config("Items per producer must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(TurnstileError::config("Jitter must be a probability in [0, 1]"));
        }
        Ok(())
    }
}

/// Caller-side retry policy selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Spin,
    Yield,
    Backoff,
    Block,
}

impl WaitKind {
    pub fn build(self) -> Arc<dyn WaitStrategy> {
        match self {
            WaitKind::Spin => Arc::new(BusySpinWaitStrategy::new()),
            WaitKind::Yield => Arc::new(YieldingWaitStrategy::with_tries(0, u32::MAX)),
            WaitKind::Backoff => Arc::new(BackoffWaitStrategy::new()),
            WaitKind::Block => Arc::new(BlockingWaitStrategy::new()),
        }
    }
}

impl FromStr for WaitKind {
    type Err = TurnstileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spin" => Ok(WaitKind::Spin),
            "yield" => Ok(WaitKind::Yield),
            "backoff" => Ok(WaitKind::Backoff),
            "block" => Ok(WaitKind::Block),
            other => Err(TurnstileError::config(format!("unknown wait strategy: {}", other))),
        }
    }
}

/// Shared counters for a run
pub struct BenchCounters {
    pub sent: AtomicU64,
    pub received: AtomicU64,
    pub full_events: AtomicU64,
    pub empty_events: AtomicU64,
    pub running: AtomicBool,
}

impl BenchCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Default for BenchCounters {
    fn default() -> Self {
        Self {
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            full_events: AtomicU64::new(0),
            empty_events: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }
}

/// Percentiles of sampled operation latency, in nanoseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencySummary {
    pub samples: u64,
    pub p50: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

impl LatencySummary {
    fn from_histogram(histogram: &Histogram<u64>) -> Self {
        if histogram.is_empty() {
            return Self::default();
        }
        Self {
            samples: histogram.len(),
            p50: histogram.value_at_quantile(0.50),
            p99: histogram.value_at_quantile(0.99),
            p999: histogram.value_at_quantile(0.999),
            max: histogram.max(),
        }
    }
}

/// Outcome of one benchmark run
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub name: &'static str,
    pub producers: usize,
    pub consumers: usize,
    pub expected: u64,
    pub consumed: u64,
    pub full_events: u64,
    pub empty_events: u64,
    pub elapsed: Duration,
    pub enqueue_latency: LatencySummary,
    pub dequeue_latency: LatencySummary,
    pub verification: Verification,
}

impl BenchReport {
    /// Consumed items per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.consumed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn mops(&self) -> f64 {
        self.throughput() / 1_000_000.0
    }

    pub fn is_success(&self) -> bool {
        self.consumed == self.expected && self.verification.is_clean()
    }
}

fn new_histogram() -> Result<Histogram<u64>> {
    Histogram::new_with_bounds(1, MAX_TRACKED_LATENCY_NS, 3)
        .map_err(|e| TurnstileError::config(format!("latency histogram: {:?}", e)))
}

fn merge_histogram(into: &mut Histogram<u64>, from: &Histogram<u64>) -> Result<()> {
    into.add(from)
        .map_err(|e| TurnstileError::config(format!("merging latency histograms: {:?}", e)))
}

/// Stops the run if the owning worker thread unwinds, so its peers leave
/// their retry loops instead of waiting for values that will never come.
struct StopOnPanic<'a>(&'a BenchCounters);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.stop();
        }
    }
}

fn pin_worker(config: &BenchConfig, index: usize) {
    if !config.pin_threads {
        return;
    }
    let cpu_id = cpu::cpu_for_worker(index);
    if let Err(e) = cpu::pin_to_cpu(cpu_id) {
        tracing::warn!(worker = index, cpu_id, error = %e, "thread pinning failed");
    }
}

/// Run one benchmark over `transport` and verify every value arrived once.
///
/// Every worker thread is joined before this returns, including when a
/// worker panics.
pub fn run_benchmark<Q>(
    transport: Arc<Q>,
    config: &BenchConfig,
    wait: Arc<dyn WaitStrategy>,
) -> Result<BenchReport>
where
    Q: Transport<u64> + 'static,
{
    config.validate()?;

    let total = config.total_items();
    let counters = BenchCounters::new();
    let name = transport.name();

    tracing::info!(
        transport = name,
        producers = config.producers,
        consumers = config.consumers,
        total,
        "starting benchmark"
    );

    // Allocate up front so nothing can fail once threads are running.
    let producer_histograms = (0..config.producers)
        .map(|_| new_histogram())
        .collect::<Result<Vec<_>>>()?;
    let consumer_histograms = (0..config.consumers)
        .map(|_| new_histogram())
        .collect::<Result<Vec<_>>>()?;

    let start = Instant::now();
    let reporter = spawn_reporter(counters.clone(), config.report_interval, start);

    let producers: Vec<_> = producer_histograms
        .into_iter()
        .enumerate()
        .map(|(id, histogram)| {
            let transport = transport.clone();
            let counters = counters.clone();
            let wait = wait.clone();
            let config = config.clone();
            thread::spawn(move || {
                let _guard = StopOnPanic(&counters);
                pin_worker(&config, id);
                produce(&*transport, &config, id as u64, &counters, &*wait, histogram)
            })
        })
        .collect();

    let consumers: Vec<_> = consumer_histograms
        .into_iter()
        .enumerate()
        .map(|(id, histogram)| {
            let transport = transport.clone();
            let counters = counters.clone();
            let wait = wait.clone();
            let config = config.clone();
            thread::spawn(move || {
                let _guard = StopOnPanic(&counters);
                pin_worker(&config, config.producers + id);
                consume(&*transport, &config, total, &counters, &*wait, histogram)
            })
        })
        .collect();

    // Join everything before looking at any result.
    let produced: Vec<_> = producers.into_iter().map(|handle| handle.join()).collect();
    let consumed: Vec<_> = consumers.into_iter().map(|handle| handle.join()).collect();

    let elapsed = start.elapsed();
    counters.stop();
    if reporter.join().is_err() {
        tracing::warn!(transport = name, "progress reporter panicked");
    }

    let mut enqueue_histogram = new_histogram()?;
    for joined in produced {
        let histogram = joined.map_err(|_| TurnstileError::config("producer thread panicked"))?;
        merge_histogram(&mut enqueue_histogram, &histogram)?;
    }

    let mut dequeue_histogram = new_histogram()?;
    let mut verifier = Verifier::new(total);
    for joined in consumed {
        let (histogram, tags) =
            joined.map_err(|_| TurnstileError::config("consumer thread panicked"))?;
        merge_histogram(&mut dequeue_histogram, &histogram)?;
        verifier.record_all(tags);
    }

    let report = BenchReport {
        name,
        producers: config.producers,
        consumers: config.consumers,
        expected: total,
        consumed: counters.received.load(Ordering::Relaxed),
        full_events: counters.full_events.load(Ordering::Relaxed),
        empty_events: counters.empty_events.load(Ordering::Relaxed),
        elapsed,
        enqueue_latency: LatencySummary::from_histogram(&enqueue_histogram),
        dequeue_latency: LatencySummary::from_histogram(&dequeue_histogram),
        verification: verifier.finish(),
    };

    tracing::info!(
        transport = name,
        consumed = report.consumed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        mops = report.mops(),
        "benchmark finished"
    );

    Ok(report)
}

fn produce<Q: Transport<u64> + ?Sized>(
    transport: &Q,
    config: &BenchConfig,
    id: u64,
    counters: &BenchCounters,
    wait: &dyn WaitStrategy,
    mut histogram: Histogram<u64>,
) -> Histogram<u64> {
    let mut rng = rand::thread_rng();
    let base = id * config.items_per_producer;

    for i in 0..config.items_per_producer {
        let sampled = config.sample_every > 0 && i % config.sample_every == 0;
        let started = sampled.then(Instant::now);

        let mut value = base + i;
        let mut attempt = 0u32;
        while let Err(rejected) = transport.offer(value) {
            if !counters.is_running() {
                return histogram;
            }
            value = rejected;
            counters.full_events.fetch_add(1, Ordering::Relaxed);
            wait.idle(attempt);
            attempt = attempt.saturating_add(1);
        }
        wait.signal_all_when_blocking();
        counters.sent.fetch_add(1, Ordering::Relaxed);

        if let Some(started) = started {
            histogram.saturating_record(started.elapsed().as_nanos() as u64);
        }
        if config.jitter > 0.0 && rng.gen_bool(config.jitter) {
            thread::yield_now();
        }
    }

    histogram
}

fn consume<Q: Transport<u64> + ?Sized>(
    transport: &Q,
    config: &BenchConfig,
    total: u64,
    counters: &BenchCounters,
    wait: &dyn WaitStrategy,
    mut histogram: Histogram<u64>,
) -> (Histogram<u64>, Vec<u64>) {
    let mut tags = Vec::with_capacity((total / config.consumers as u64) as usize);
    let mut taken = 0u64;

    while counters.is_running() && counters.received.load(Ordering::Relaxed) < total {
        let sampled = config.sample_every > 0 && taken % config.sample_every == 0;
        let started = sampled.then(Instant::now);

        let mut attempt = 0u32;
        let value = loop {
            if let Some(value) = transport.poll() {
                break Some(value);
            }
            counters.empty_events.fetch_add(1, Ordering::Relaxed);
            if !counters.is_running() || counters.received.load(Ordering::Relaxed) >= total {
                break None;
            }
            wait.idle(attempt);
            attempt = attempt.saturating_add(1);
        };

        let Some(value) = value else {
            break;
        };
        wait.signal_all_when_blocking();
        counters.received.fetch_add(1, Ordering::Relaxed);
        tags.push(value);
        taken += 1;

        if let Some(started) = started {
            histogram.saturating_record(started.elapsed().as_nanos() as u64);
        }
    }

    (histogram, tags)
}

fn spawn_reporter(
    counters: Arc<BenchCounters>,
    interval: Duration,
    start: Instant,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let tick = interval.min(Duration::from_millis(50));
        let mut last_report = Instant::now();
        let mut last_received = 0u64;

        while counters.is_running() {
            thread::sleep(tick);
            if last_report.elapsed() < interval {
                continue;
            }

            let received = counters.received.load(Ordering::Relaxed);
            let rate = (received - last_received) as f64 / last_report.elapsed().as_secs_f64();
            tracing::info!(
                elapsed_s = start.elapsed().as_secs_f64(),
                sent = counters.sent.load(Ordering::Relaxed),
                received,
                rate = rate as u64,
                "progress"
            );
            last_received = received;
            last_report = Instant::now();
        }
    })
}

/// Print a summary of benchmark results
pub fn print_summary(report: &BenchReport) {
    println!("------------------------------------------------");
    println!("Benchmarking: {}", report.name);
    println!("Producers:    {}, Consumers: {}", report.producers, report.consumers);
    println!("Consumed:     {} / {}", report.consumed, report.expected);
    println!("Time:         {:.4} s", report.elapsed.as_secs_f64());
    println!("Throughput:   {:.4} M ops/sec", report.mops());
    println!("Full/Empty:   {} / {}", report.full_events, report.empty_events);
    for (label, latency) in [("Enqueue", &report.enqueue_latency), ("Dequeue", &report.dequeue_latency)] {
        if latency.samples > 0 {
            println!(
                "{} ns:   p50={} p99={} p99.9={} max={} ({} samples)",
                label, latency.p50, latency.p99, latency.p999, latency.max, latency.samples
            );
        }
    }

    let v = &report.verification;
    if report.is_success() {
        println!("SUCCESS!");
    } else {
        println!(
            "FAILURE! missing={} duplicates={} out_of_range={}",
            v.missing, v.duplicates, v.out_of_range
        );
    }
}

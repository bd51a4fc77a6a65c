//! Two-thread throughput harness.
//!
//! One producer pushes the sequence `0, 1, 2, ...` (as `u32`) into a fresh
//! queue while one consumer pops and checks every value against the expected
//! sequence number. When the queue is full or empty a side waits according
//! to [`WaitStrategy`]: a pure `spin_loop` busy-wait by default, or a
//! [`Backoff`] that yields once its spin budget is spent. Wall time covers
//! thread start through join.

use crate::affinity::pin_if_requested;
use basalt_spsc::{QueueError, SpscQueue};
use crossbeam_utils::Backoff;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

/// What a side does while the queue is full (producer) or empty (consumer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// `spin_loop` only. Both threads need a core of their own.
    #[default]
    Spin,
    /// Spin, then yield the thread. Makes progress on a single CPU.
    Backoff,
}

impl WaitStrategy {
    #[inline(always)]
    fn wait(self, backoff: &Backoff) {
        match self {
            WaitStrategy::Spin => std::hint::spin_loop(),
            WaitStrategy::Backoff => backoff.snooze(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputConfig {
    /// Slot count of the queue under test.
    pub slots: usize,
    /// Values transferred per run.
    pub iterations: u64,
    pub producer_core: Option<usize>,
    pub consumer_core: Option<usize>,
    pub wait: WaitStrategy,
}

impl ThroughputConfig {
    pub fn new(slots: usize, iterations: u64) -> Self {
        Self {
            slots,
            iterations,
            producer_core: None,
            consumer_core: None,
            wait: WaitStrategy::Spin,
        }
    }

    pub fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub slots: usize,
    pub iterations: u64,
    pub elapsed_ns: u64,
}

impl RunReport {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ns as f64 / 1e9
    }

    pub fn ns_per_op(&self) -> f64 {
        self.elapsed_ns as f64 / self.iterations.max(1) as f64
    }

    pub fn ops_per_sec(&self) -> f64 {
        if self.elapsed_ns == 0 {
            return 0.0;
        }
        self.iterations as f64 / self.elapsed_secs()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("value #{index}: expected {expected}, got {got}")]
    OutOfOrder { index: u64, expected: u32, got: u32 },

    #[error("{role} thread panicked")]
    ThreadPanicked { role: &'static str },
}

/// Raises the abort flag if the owning thread unwinds.
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

/// Runs one producer/consumer transfer of `cfg.iterations` values.
pub fn run_throughput(cfg: &ThroughputConfig) -> Result<RunReport, HarnessError> {
    let mut queue = SpscQueue::<u32>::with_capacity(cfg.slots)?;
    let (mut tx, mut rx) = queue.split();
    let abort_flag = AtomicBool::new(false);
    let abort = &abort_flag;
    let iterations = cfg.iterations;
    let wait = cfg.wait;

    let start = Instant::now();
    thread::scope(|s| {
        let producer = s.spawn(move || {
            let _guard = AbortOnPanic(abort);
            pin_if_requested("producer", cfg.producer_core);
            for i in 0..iterations {
                let mut value = i as u32;
                let backoff = Backoff::new();
                while let Err(back) = tx.try_push(value) {
                    if abort.load(Ordering::Relaxed) {
                        return;
                    }
                    value = back;
                    wait.wait(&backoff);
                }
            }
        });

        let consumer = s.spawn(move || {
            let _guard = AbortOnPanic(abort);
            pin_if_requested("consumer", cfg.consumer_core);
            for index in 0..iterations {
                let expected = index as u32;
                let backoff = Backoff::new();
                let got = loop {
                    if let Some(v) = rx.try_pop() {
                        break v;
                    }
                    if abort.load(Ordering::Relaxed) {
                        return Err(HarnessError::ThreadPanicked { role: "producer" });
                    }
                    wait.wait(&backoff);
                };
                if got != expected {
                    abort.store(true, Ordering::Relaxed);
                    return Err(HarnessError::OutOfOrder {
                        index,
                        expected,
                        got,
                    });
                }
            }
            Ok(())
        });

        let consumed = consumer
            .join()
            .unwrap_or(Err(HarnessError::ThreadPanicked { role: "consumer" }));
        let produced = producer
            .join()
            .map_err(|_| HarnessError::ThreadPanicked { role: "producer" });
        produced.and(consumed)
    })?;
    let elapsed = start.elapsed();

    Ok(RunReport {
        slots: cfg.slots,
        iterations,
        elapsed_ns: elapsed.as_nanos() as u64,
    })
}

/// Repeats [`run_throughput`] `runs` times, logging each result.
pub fn run_many(cfg: &ThroughputConfig, runs: usize) -> Result<Vec<RunReport>, HarnessError> {
    let mut reports = Vec::with_capacity(runs);
    for run in 1..=runs {
        let report = run_throughput(cfg)?;
        tracing::info!(
            run,
            runs,
            slots = report.slots,
            iterations = report.iterations,
            wait = ?cfg.wait,
            elapsed_s = report.elapsed_secs(),
            ns_per_op = report.ns_per_op(),
            ops_per_sec = report.ops_per_sec(),
            "run finished"
        );
        reports.push(report);
    }
    Ok(reports)
}

//! Throughput measurement for `basalt-spsc`.
//!
//! The harness drives a queue the way a real pipeline would: one dedicated
//! producer thread, one dedicated consumer thread, both spinning (or backing
//! off) on full/empty. [`BenchReport`] collects the runs and serializes them for the
//! `basalt-bench` binary.

mod affinity;
mod stats;
mod throughput;

pub use affinity::pin_current_thread;
pub use stats::{Summary, summarize};
pub use throughput::{
    HarnessError, RunReport, ThroughputConfig, WaitStrategy, run_many, run_throughput,
};

use serde::Serialize;

/// All runs of one benchmark invocation plus their ns/op summary.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub runs: Vec<RunReport>,
    pub ns_per_op: Option<Summary>,
}

impl BenchReport {
    pub fn new(runs: Vec<RunReport>) -> Self {
        let samples: Vec<f64> = runs.iter().map(RunReport::ns_per_op).collect();
        Self {
            ns_per_op: summarize(&samples),
            runs,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Formats an operation rate with a metric suffix, e.g. `152.3 M/s`.
pub fn format_rate(ops_per_sec: f64) -> String {
    if ops_per_sec >= 1e9 {
        format!("{:.2} G/s", ops_per_sec / 1e9)
    } else if ops_per_sec >= 1e6 {
        format!("{:.1} M/s", ops_per_sec / 1e6)
    } else if ops_per_sec >= 1e3 {
        format!("{:.1} K/s", ops_per_sec / 1e3)
    } else {
        format!("{ops_per_sec:.0} /s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_summarizes_runs() {
        let runs = vec![
            RunReport {
                slots: 16,
                iterations: 100,
                elapsed_ns: 1_000,
            },
            RunReport {
                slots: 16,
                iterations: 100,
                elapsed_ns: 3_000,
            },
        ];
        let report = BenchReport::new(runs);
        let summary = report.ns_per_op.clone().unwrap();
        assert_eq!(summary.mean, 20.0);
        assert_eq!(summary.count, 2);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"elapsed_ns\": 3000"));
    }

    #[test]
    fn rates_pick_a_suffix() {
        assert_eq!(format_rate(2.5e9), "2.50 G/s");
        assert_eq!(format_rate(152.34e6), "152.3 M/s");
        assert_eq!(format_rate(1_500.0), "1.5 K/s");
        assert_eq!(format_rate(12.0), "12 /s");
    }
}
